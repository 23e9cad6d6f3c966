//! Frame Descriptor model and input validation.
//!
//! A [`FrameDescriptor`] is one planned visual unit of a scene as handed to
//! the engine by the upstream storyboard planner. The engine never mutates
//! descriptors; it only reads them and produces assignments alongside.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scale::{ScaleBucket, ScaleHistory};
use crate::types::{CharacterId, FrameNumber, SequenceId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShotType {
    #[serde(rename = "establishing")]
    Establishing,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "close-up")]
    CloseUp,
    #[serde(rename = "extreme_close-up")]
    ExtremeCloseUp,
    #[serde(rename = "insert")]
    Insert,
    #[serde(rename = "dialogue")]
    Dialogue,
    #[serde(rename = "action")]
    Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraAngle {
    #[serde(rename = "wide")]
    Wide,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "close-up")]
    CloseUp,
    #[serde(rename = "extreme_close-up")]
    ExtremeCloseUp,
}

impl CameraAngle {
    /// Close-up or tighter.
    pub fn is_close(self) -> bool {
        matches!(self, Self::CloseUp | Self::ExtremeCloseUp)
    }
}

/// Position of a frame inside a start → middle → end action sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceRole {
    Start,
    Middle,
    End,
}

// ---------------------------------------------------------------------------
// CharacterPresence
// ---------------------------------------------------------------------------

/// A character visible in a frame and how large they render.
///
/// `scale` wins over `face_height_px` when both are given. When neither is
/// set the engine consults the scene's [`ScaleHistory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterPresence {
    pub character_id: CharacterId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_height_px: Option<u32>,
}

impl CharacterPresence {
    pub fn new(character_id: impl Into<CharacterId>, scale: ScaleBucket) -> Self {
        Self {
            character_id: character_id.into(),
            scale: Some(scale),
            face_height_px: None,
        }
    }

    /// Scale carried by the presence itself, without history lookup.
    pub fn own_scale(&self) -> Option<ScaleBucket> {
        self.scale
            .or_else(|| self.face_height_px.map(ScaleBucket::from_face_height))
    }
}

// ---------------------------------------------------------------------------
// FrameDescriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    pub frame_number: FrameNumber,
    pub shot_type: ShotType,
    pub camera_angle: CameraAngle,
    #[serde(default)]
    pub has_dialogue: bool,
    #[serde(default)]
    pub characters_present: Vec<CharacterPresence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<SequenceId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_role: Option<SequenceRole>,
    #[serde(default)]
    pub environment_id: String,
    /// Set by the planner on a character's first medium or close
    /// appearance in the scene.
    #[serde(default)]
    pub introduces_character: bool,
}

impl FrameDescriptor {
    /// A frame with no dialogue, no characters and no sequence.
    pub fn new(frame_number: FrameNumber, shot_type: ShotType, camera_angle: CameraAngle) -> Self {
        Self {
            frame_number,
            shot_type,
            camera_angle,
            has_dialogue: false,
            characters_present: Vec::new(),
            sequence_id: None,
            sequence_role: None,
            environment_id: String::new(),
            introduces_character: false,
        }
    }

    pub fn with_dialogue(mut self) -> Self {
        self.has_dialogue = true;
        self
    }

    pub fn with_character(mut self, character_id: impl Into<CharacterId>, scale: ScaleBucket) -> Self {
        self.characters_present
            .push(CharacterPresence::new(character_id, scale));
        self
    }

    pub fn with_presence(mut self, presence: CharacterPresence) -> Self {
        self.characters_present.push(presence);
        self
    }

    pub fn in_sequence(mut self, sequence_id: impl Into<SequenceId>, role: SequenceRole) -> Self {
        self.sequence_id = Some(sequence_id.into());
        self.sequence_role = Some(role);
        self
    }

    pub fn introducing(mut self) -> Self {
        self.introduces_character = true;
        self
    }

    /// Resolved `(character, scale)` pairs for this frame, in presence
    /// order. Characters whose scale cannot be resolved are skipped.
    pub fn resolved_scales(&self, history: &ScaleHistory) -> Vec<(CharacterId, ScaleBucket)> {
        self.characters_present
            .iter()
            .filter_map(|p| {
                p.own_scale()
                    .or_else(|| history.lookup(&p.character_id, self.frame_number))
                    .map(|scale| (p.character_id.clone(), scale))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate one scene's frame list before any strategy work starts.
///
/// Rejects zero frame numbers, non-increasing frame order, half-specified
/// sequence membership, empty ids, and characters listed twice in a frame.
pub fn validate_frames(frames: &[FrameDescriptor]) -> Result<(), CoreError> {
    let mut previous: Option<FrameNumber> = None;

    for frame in frames {
        let n = frame.frame_number;
        if n == 0 {
            return Err(CoreError::invalid_frame(n, "frame_number must be >= 1"));
        }
        if let Some(prev) = previous {
            if n <= prev {
                return Err(CoreError::invalid_frame(
                    n,
                    format!("frame_number must be strictly increasing (follows {prev})"),
                ));
            }
        }
        previous = Some(n);

        match (&frame.sequence_id, frame.sequence_role) {
            (Some(id), Some(_)) if id.trim().is_empty() => {
                return Err(CoreError::invalid_frame(n, "sequence_id must not be empty"));
            }
            (Some(id), None) => {
                return Err(CoreError::invalid_frame(
                    n,
                    format!("sequence_role is required when sequence_id '{id}' is set"),
                ));
            }
            (None, Some(role)) => {
                return Err(CoreError::invalid_frame(
                    n,
                    format!("sequence_role {role:?} is set without a sequence_id"),
                ));
            }
            _ => {}
        }

        let mut seen = HashSet::new();
        for presence in &frame.characters_present {
            if presence.character_id.trim().is_empty() {
                return Err(CoreError::invalid_frame(n, "character_id must not be empty"));
            }
            if !seen.insert(presence.character_id.as_str()) {
                return Err(CoreError::invalid_frame(
                    n,
                    format!("character '{}' is listed more than once", presence.character_id),
                ));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
