//! Consistency Rule Set.
//!
//! Frame-level rules decide whether a single frame must be generated on its
//! own. They are evaluated in [`FRAME_RULES`] order and the first rule that
//! forbids a frame is the one reported. Group-level rules (mixed scale,
//! sequence continuity) only make sense over a set of frames and are
//! applied by the grouper and re-checked by the validator.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::frame::{CameraAngle, FrameDescriptor, ShotType};
use crate::scale::ScaleBucket;
use crate::types::{CharacterId, FrameNumber};

// ---------------------------------------------------------------------------
// RuleId
// ---------------------------------------------------------------------------

/// Every rule the engine enforces, in priority order.
///
/// `GridGeometry` is the structural check on group shape. Frames left over
/// after grid packing are reported under it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    DialogueCloseup,
    ExtremeDetail,
    CharacterIntroduction,
    MixedScale,
    SequenceContinuity,
    GridGeometry,
}

impl RuleId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DialogueCloseup => "dialogue_closeup",
            Self::ExtremeDetail => "extreme_detail",
            Self::CharacterIntroduction => "character_introduction",
            Self::MixedScale => "mixed_scale",
            Self::SequenceContinuity => "sequence_continuity",
            Self::GridGeometry => "grid_geometry",
        }
    }

    /// Audit text attached to frames this rule forces to individual.
    pub fn reason(self) -> &'static str {
        match self {
            Self::DialogueCloseup => "dialogue close-up requires lip-sync and facial fidelity",
            Self::ExtremeDetail => "extreme close-up requires maximum detail",
            Self::CharacterIntroduction => "character introduction requires a reference-quality render",
            Self::MixedScale => "character scale conflicts with other composite candidates",
            Self::SequenceContinuity => "sequence continuity with individually generated frames",
            Self::GridGeometry => "no supported grid geometry could be filled",
        }
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Frame-level rules
// ---------------------------------------------------------------------------

/// A predicate that can forbid one frame from composite generation.
pub trait FrameRule {
    fn id(&self) -> RuleId;

    /// `true` when the frame must be generated individually.
    fn forbids(&self, frame: &FrameDescriptor) -> bool;
}

/// Dialogue at close-up or tighter needs lip-sync fidelity.
pub struct DialogueCloseupRule;

impl FrameRule for DialogueCloseupRule {
    fn id(&self) -> RuleId {
        RuleId::DialogueCloseup
    }

    fn forbids(&self, frame: &FrameDescriptor) -> bool {
        frame.has_dialogue && frame.camera_angle.is_close()
    }
}

/// Extreme close-ups, with or without dialogue.
pub struct ExtremeDetailRule;

impl FrameRule for ExtremeDetailRule {
    fn id(&self) -> RuleId {
        RuleId::ExtremeDetail
    }

    fn forbids(&self, frame: &FrameDescriptor) -> bool {
        frame.camera_angle == CameraAngle::ExtremeCloseUp
            || frame.shot_type == ShotType::ExtremeCloseUp
    }
}

/// A character's first medium or close appearance, as flagged by the planner.
pub struct CharacterIntroductionRule;

impl FrameRule for CharacterIntroductionRule {
    fn id(&self) -> RuleId {
        RuleId::CharacterIntroduction
    }

    fn forbids(&self, frame: &FrameDescriptor) -> bool {
        frame.introduces_character
    }
}

/// Frame-level rules in evaluation order.
pub static FRAME_RULES: [&(dyn FrameRule + Sync); 3] = [
    &DialogueCloseupRule,
    &ExtremeDetailRule,
    &CharacterIntroductionRule,
];

/// The first frame-level rule that forbids `frame`, if any.
pub fn first_forbidding_rule(frame: &FrameDescriptor) -> Option<RuleId> {
    FRAME_RULES
        .iter()
        .find(|rule| rule.forbids(frame))
        .map(|rule| rule.id())
}

// ---------------------------------------------------------------------------
// Mixed-scale rule
// ---------------------------------------------------------------------------

/// Resolved `(character, scale)` pairs of one frame.
pub type ScaleProfile = Vec<(CharacterId, ScaleBucket)>;

/// A character shown at incompatible scales by two frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleConflict {
    pub character_id: CharacterId,
    pub first: ScaleBucket,
    pub second: ScaleBucket,
}

/// Pairwise check: the first character `a` and `b` both show at scales
/// more than one bucket apart.
pub fn scale_conflict(a: &ScaleProfile, b: &ScaleProfile) -> Option<ScaleConflict> {
    a.iter().find_map(|(character, scale_a)| {
        b.iter()
            .find(|(other, _)| other == character)
            .filter(|(_, scale_b)| !scale_a.is_compatible_with(*scale_b))
            .map(|(_, scale_b)| ScaleConflict {
                character_id: character.clone(),
                first: *scale_a,
                second: *scale_b,
            })
    })
}

/// Set check: the first character (by id) whose scales across `profiles`
/// do not fit in one window of two adjacent buckets.
pub fn mixed_scale_character<'a>(
    profiles: impl IntoIterator<Item = &'a ScaleProfile>,
) -> Option<(CharacterId, BTreeSet<ScaleBucket>)> {
    let mut scales: BTreeMap<&str, BTreeSet<ScaleBucket>> = BTreeMap::new();
    for profile in profiles {
        for (character, scale) in profile {
            scales.entry(character.as_str()).or_default().insert(*scale);
        }
    }
    scales.into_iter().find_map(|(character, buckets)| {
        let lowest = *buckets.first()?;
        let highest = *buckets.last()?;
        (!lowest.is_compatible_with(highest)).then(|| (character.to_string(), buckets))
    })
}

/// Choose which frames to drop so that no character in `members` spans
/// more than two adjacent scale buckets.
///
/// For each conflicting character the window of two adjacent buckets
/// holding the most frames is kept and the character's other frames are
/// dropped. On a tie, the window whose dropped frames come later in the
/// scene is kept. Returns the dropped frame numbers in ascending order.
pub fn resolve_mixed_scale(members: &[(FrameNumber, &ScaleProfile)]) -> Vec<FrameNumber> {
    let mut remaining: Vec<(FrameNumber, &ScaleProfile)> = members.to_vec();
    let mut dropped = Vec::new();

    while let Some((character, _)) = mixed_scale_character(remaining.iter().map(|(_, p)| *p)) {
        let appearances: Vec<(FrameNumber, ScaleBucket)> = remaining
            .iter()
            .filter_map(|(n, profile)| {
                profile
                    .iter()
                    .find(|(c, _)| *c == character)
                    .map(|(_, scale)| (*n, *scale))
            })
            .collect();

        let mut best: Option<Vec<FrameNumber>> = None;
        for window in ScaleBucket::ALL.windows(2) {
            let mut outside: Vec<FrameNumber> = appearances
                .iter()
                .filter(|(_, scale)| !window.contains(scale))
                .map(|(n, _)| *n)
                .collect();
            outside.sort_unstable();
            best = match best {
                None => Some(outside),
                Some(current) if prefer_dropping(&outside, &current) => Some(outside),
                keep => keep,
            };
        }

        let Some(drop) = best else { break };
        remaining.retain(|(n, _)| !drop.contains(n));
        dropped.extend(drop);
    }

    dropped.sort_unstable();
    dropped
}

/// `true` when dropping `candidate` is better than dropping `current`:
/// fewer frames, or as many frames but later ones.
fn prefer_dropping(candidate: &[FrameNumber], current: &[FrameNumber]) -> bool {
    match candidate.len().cmp(&current.len()) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => candidate > current,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
