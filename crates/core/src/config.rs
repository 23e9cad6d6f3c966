//! Engine configuration.

use serde::Serialize;

use crate::error::CoreError;
use crate::grid::GridFormat;

/// Tunables for one engine instance.
///
/// The grid formats are kept largest first and de-duplicated; the
/// smallest enabled format sets the minimum composite group size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    grid_formats: Vec<GridFormat>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid_formats: GridFormat::LARGEST_FIRST.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Build a configuration from an explicit set of grid formats.
    pub fn with_grid_formats(
        formats: impl IntoIterator<Item = GridFormat>,
    ) -> Result<Self, CoreError> {
        let mut grid_formats: Vec<GridFormat> = formats.into_iter().collect();
        grid_formats.sort_by(|a, b| b.cmp(a));
        grid_formats.dedup();
        if grid_formats.is_empty() {
            return Err(CoreError::Validation(
                "at least one grid format must be enabled".to_string(),
            ));
        }
        Ok(Self { grid_formats })
    }

    /// Parse a comma-separated list such as `"3x3,2x2"`.
    pub fn parse_grid_formats(list: &str) -> Result<Self, CoreError> {
        let formats = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<GridFormat>)
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_grid_formats(formats)
    }

    /// Enabled formats, largest first.
    pub fn grid_formats(&self) -> &[GridFormat] {
        &self.grid_formats
    }

    pub fn supports(&self, format: GridFormat) -> bool {
        self.grid_formats.contains(&format)
    }

    /// Smallest number of frames that can form a group.
    pub fn min_group_size(&self) -> usize {
        self.grid_formats
            .iter()
            .map(|f| f.capacity())
            .min()
            .unwrap_or(usize::MAX)
    }

    /// Largest enabled format whose capacity fits in `available` frames.
    pub fn largest_fitting(&self, available: usize) -> Option<GridFormat> {
        self.grid_formats
            .iter()
            .copied()
            .find(|f| f.capacity() <= available)
    }
}
