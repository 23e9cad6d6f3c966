//! On-screen scale buckets and per-scene scale history.
//!
//! A character's scale is a coarse classification of how large their face
//! renders in a frame. Composite grids tolerate small differences in scale
//! for the same character but not large ones, so the rule set compares
//! buckets by their distance on this ordinal scale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{CharacterId, FrameNumber};

// ---------------------------------------------------------------------------
// Face-height thresholds (pixels)
// ---------------------------------------------------------------------------

/// Faces below this height are `Tiny` (far shots, face not recognizable).
pub const TINY_MAX_FACE_PX: u32 = 40;
/// Faces below this height are `Small` (barely recognizable).
pub const SMALL_MAX_FACE_PX: u32 = 200;
/// Faces below this height are `Medium` (recognizable).
pub const MEDIUM_MAX_FACE_PX: u32 = 400;
/// Faces below this height are `Large`; anything above is `VeryLarge`.
pub const LARGE_MAX_FACE_PX: u32 = 800;

// ---------------------------------------------------------------------------
// ScaleBucket
// ---------------------------------------------------------------------------

/// Discretized on-screen size of a character, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleBucket {
    Tiny,
    Small,
    Medium,
    Large,
    VeryLarge,
}

impl ScaleBucket {
    /// Every bucket in ascending order.
    pub const ALL: [ScaleBucket; 5] = [
        Self::Tiny,
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::VeryLarge,
    ];

    /// Bucket an estimated face height in pixels.
    pub fn from_face_height(px: u32) -> Self {
        if px < TINY_MAX_FACE_PX {
            Self::Tiny
        } else if px < SMALL_MAX_FACE_PX {
            Self::Small
        } else if px < MEDIUM_MAX_FACE_PX {
            Self::Medium
        } else if px < LARGE_MAX_FACE_PX {
            Self::Large
        } else {
            Self::VeryLarge
        }
    }

    /// Position on the ordinal scale (`Tiny` = 0).
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    /// Two buckets may share a composite group when they are equal or
    /// neighbours on the scale.
    pub fn is_compatible_with(self, other: ScaleBucket) -> bool {
        self.ordinal().abs_diff(other.ordinal()) <= 1
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::VeryLarge => "very_large",
        }
    }
}

impl std::fmt::Display for ScaleBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ScaleHistory
// ---------------------------------------------------------------------------

/// One known scale of a character at a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleObservation {
    pub frame_number: FrameNumber,
    pub scale: ScaleBucket,
}

/// Known scale observations per character across one scene.
///
/// Used to resolve the scale of a character presence that carries neither
/// an explicit bucket nor a face-height estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleHistory {
    entries: BTreeMap<CharacterId, Vec<ScaleObservation>>,
}

impl ScaleHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a scale for `character` at `frame_number`, replacing any
    /// earlier observation for the same frame.
    pub fn record(
        &mut self,
        character: impl Into<CharacterId>,
        frame_number: FrameNumber,
        scale: ScaleBucket,
    ) {
        let observations = self.entries.entry(character.into()).or_default();
        match observations.binary_search_by_key(&frame_number, |o| o.frame_number) {
            Ok(idx) => observations[idx].scale = scale,
            Err(idx) => observations.insert(idx, ScaleObservation { frame_number, scale }),
        }
    }

    /// Builder form of [`record`](Self::record).
    pub fn with(
        mut self,
        character: impl Into<CharacterId>,
        frame_number: FrameNumber,
        scale: ScaleBucket,
    ) -> Self {
        self.record(character, frame_number, scale);
        self
    }

    /// Scale of `character` at `frame_number`: the observation at that
    /// frame, else the latest observation at an earlier frame.
    pub fn lookup(&self, character: &str, frame_number: FrameNumber) -> Option<ScaleBucket> {
        let observations = self.entries.get(character)?;
        let mut sorted: Vec<&ScaleObservation> = observations.iter().collect();
        // Deserialized histories are not guaranteed to be sorted.
        sorted.sort_by_key(|o| o.frame_number);
        sorted
            .iter()
            .rev()
            .find(|o| o.frame_number <= frame_number)
            .map(|o| o.scale)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
