//! Dialogue run detection.
//!
//! Consecutive dialogue close-ups usually cover one conversation. The runs
//! are reported with the plan so reference images for the speaking
//! characters can be prepared before individual generation starts.

use crate::frame::FrameDescriptor;
use crate::rules::{DialogueCloseupRule, FrameRule};
use crate::types::FrameNumber;

/// Shortest run reported as a dialogue sequence.
pub const MIN_DIALOGUE_RUN: usize = 2;

/// Maximal runs of adjacent frames forbidden by the dialogue-closeup rule.
pub fn dialogue_runs(frames: &[FrameDescriptor]) -> Vec<Vec<FrameNumber>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for frame in frames {
        if DialogueCloseupRule.forbids(frame) {
            current.push(frame.frame_number);
            continue;
        }
        if current.len() >= MIN_DIALOGUE_RUN {
            runs.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= MIN_DIALOGUE_RUN {
        runs.push(current);
    }

    runs
}
