//! Composite grid geometries.
//!
//! A composite generation call renders one image split into equal cells.
//! Cells are filled row-major in member order, so a group's member list
//! doubles as its grid-fill order.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GridFormat {
    #[serde(rename = "2x2")]
    TwoByTwo,
    #[serde(rename = "2x3")]
    TwoByThree,
    #[serde(rename = "3x3")]
    ThreeByThree,
}

impl GridFormat {
    /// Supported geometries, largest first (packing preference order).
    pub const LARGEST_FIRST: [GridFormat; 3] = [Self::ThreeByThree, Self::TwoByThree, Self::TwoByTwo];

    pub fn rows(self) -> usize {
        match self {
            Self::TwoByTwo | Self::TwoByThree => 2,
            Self::ThreeByThree => 3,
        }
    }

    pub fn cols(self) -> usize {
        match self {
            Self::TwoByTwo => 2,
            Self::TwoByThree | Self::ThreeByThree => 3,
        }
    }

    /// Number of frames one grid holds.
    pub fn capacity(self) -> usize {
        self.rows() * self.cols()
    }

    /// The geometry holding exactly `count` frames, if any.
    pub fn for_count(count: usize) -> Option<Self> {
        Self::LARGEST_FIRST
            .into_iter()
            .find(|format| format.capacity() == count)
    }

    /// `(row, col)` of the cell at grid-fill `index`, or `None` when the
    /// index is outside the grid.
    pub fn cell_position(self, index: usize) -> Option<(usize, usize)> {
        if index >= self.capacity() {
            return None;
        }
        Some((index / self.cols(), index % self.cols()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TwoByTwo => "2x2",
            Self::TwoByThree => "2x3",
            Self::ThreeByThree => "3x3",
        }
    }
}

impl std::fmt::Display for GridFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GridFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "2x2" => Ok(Self::TwoByTwo),
            "2x3" => Ok(Self::TwoByThree),
            "3x3" => Ok(Self::ThreeByThree),
            other => Err(CoreError::Validation(format!(
                "Unknown grid format: '{other}'. Valid formats: 2x2, 2x3, 3x3"
            ))),
        }
    }
}
