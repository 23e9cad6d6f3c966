//! Engine output: per-frame strategy assignments and composite groups.

use serde::{Deserialize, Serialize};

use crate::frame::FrameDescriptor;
use crate::grid::GridFormat;
use crate::rules::RuleId;
use crate::stats::{PlanStatistics, Recommendation};
use crate::types::{FrameNumber, GroupId};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Individual,
    Composite,
}

/// Reason text of a provisional composite assignment.
pub const REASON_ELIGIBLE: &str = "eligible";

// ---------------------------------------------------------------------------
// StrategyAssignment
// ---------------------------------------------------------------------------

/// Strategy decision attached to one frame.
///
/// `composite_group_id` is set iff `strategy` is [`Strategy::Composite`]
/// once the plan is final. `rule` names the rule that forced an individual
/// frame and is `None` for composite frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAssignment {
    pub frame_number: FrameNumber,
    pub strategy: Strategy,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    #[serde(default)]
    pub composite_group_id: Option<GroupId>,
}

impl StrategyAssignment {
    pub fn eligible(frame_number: FrameNumber) -> Self {
        Self {
            frame_number,
            strategy: Strategy::Composite,
            reason: REASON_ELIGIBLE.to_string(),
            rule: None,
            composite_group_id: None,
        }
    }

    pub fn forced(frame_number: FrameNumber, rule: RuleId) -> Self {
        Self {
            frame_number,
            strategy: Strategy::Individual,
            reason: rule.reason().to_string(),
            rule: Some(rule),
            composite_group_id: None,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.strategy == Strategy::Composite
    }

    /// Move this frame to individual generation.
    pub(crate) fn demote(&mut self, rule: Option<RuleId>, reason: impl Into<String>) {
        self.strategy = Strategy::Individual;
        self.rule = rule;
        self.reason = reason.into();
        self.composite_group_id = None;
    }
}

// ---------------------------------------------------------------------------
// CompositeGroup
// ---------------------------------------------------------------------------

/// Frames rendered together in one composite grid call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeGroup {
    pub group_id: GroupId,
    /// Member frame numbers in grid-fill order.
    pub frame_numbers: Vec<FrameNumber>,
    pub grid_format: GridFormat,
}

impl CompositeGroup {
    /// `(frame_number, row, col)` for every member.
    pub fn cells(&self) -> impl Iterator<Item = (FrameNumber, usize, usize)> + '_ {
        self.frame_numbers
            .iter()
            .enumerate()
            .filter_map(|(idx, n)| {
                self.grid_format
                    .cell_position(idx)
                    .map(|(row, col)| (*n, row, col))
            })
    }

    pub fn contains(&self, frame_number: FrameNumber) -> bool {
        self.frame_numbers.contains(&frame_number)
    }
}

// ---------------------------------------------------------------------------
// ScenePlan
// ---------------------------------------------------------------------------

/// Validated strategy plan for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePlan {
    /// One assignment per input frame, in input order.
    pub assignments: Vec<StrategyAssignment>,
    pub groups: Vec<CompositeGroup>,
    pub statistics: PlanStatistics,
    /// Runs of consecutive dialogue close-ups, by frame number.
    pub dialogue_sequences: Vec<Vec<FrameNumber>>,
    pub recommendations: Vec<Recommendation>,
}

impl ScenePlan {
    pub fn assignment(&self, frame_number: FrameNumber) -> Option<&StrategyAssignment> {
        self.assignments
            .iter()
            .find(|a| a.frame_number == frame_number)
    }

    pub fn group(&self, group_id: &str) -> Option<&CompositeGroup> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    pub fn individual_frames(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.assignments
            .iter()
            .filter(|a| a.strategy == Strategy::Individual)
            .map(|a| a.frame_number)
    }

    /// Pair every input frame with its assignment.
    pub fn annotate<'a>(&'a self, frames: &'a [FrameDescriptor]) -> Vec<AnnotatedFrame<'a>> {
        frames
            .iter()
            .zip(&self.assignments)
            .map(|(frame, assignment)| AnnotatedFrame {
                frame,
                strategy: assignment.strategy,
                reason: &assignment.reason,
                rule: assignment.rule,
                composite_group_id: assignment.composite_group_id.as_deref(),
            })
            .collect()
    }
}

/// A frame descriptor with its assignment fields flattened alongside, the
/// shape downstream generation collaborators consume.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedFrame<'a> {
    #[serde(flatten)]
    pub frame: &'a FrameDescriptor,
    pub strategy: Strategy,
    pub reason: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    pub composite_group_id: Option<&'a str>,
}
