//! Provisional per-frame classification.

use crate::frame::FrameDescriptor;
use crate::plan::StrategyAssignment;
use crate::rules::first_forbidding_rule;

/// Assign each frame a provisional strategy from the frame-level rules.
///
/// Frames forbidden by a rule become individual with that rule's reason;
/// every other frame is provisionally composite. Single pass, input order.
pub fn classify(frames: &[FrameDescriptor]) -> Vec<StrategyAssignment> {
    frames
        .iter()
        .map(|frame| match first_forbidding_rule(frame) {
            Some(rule) => StrategyAssignment::forced(frame.frame_number, rule),
            None => StrategyAssignment::eligible(frame.frame_number),
        })
        .collect()
}
