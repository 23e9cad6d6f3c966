//! Action sequences and the sequence-continuity closure.
//!
//! Frames sharing a `sequence_id` depict one continuous action and are
//! interpolated downstream, so they must all use the same strategy. Once
//! any member is individual, every member becomes individual.

use std::collections::{BTreeMap, VecDeque};

use crate::frame::FrameDescriptor;
use crate::plan::{Strategy, StrategyAssignment};
use crate::rules::RuleId;
use crate::types::{FrameNumber, SequenceId};

/// Scene-wide index of sequence membership, by frame position.
#[derive(Debug, Clone, Default)]
pub struct SequenceIndex {
    sequences: Vec<(SequenceId, Vec<usize>)>,
    of_frame: Vec<Option<usize>>,
}

impl SequenceIndex {
    pub fn build(frames: &[FrameDescriptor]) -> Self {
        let mut by_id: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, frame) in frames.iter().enumerate() {
            if let Some(id) = frame.sequence_id.as_deref() {
                by_id.entry(id).or_default().push(idx);
            }
        }

        let mut of_frame = vec![None; frames.len()];
        let sequences: Vec<(SequenceId, Vec<usize>)> = by_id
            .into_iter()
            .map(|(id, members)| (id.to_string(), members))
            .collect();
        for (seq, (_, members)) in sequences.iter().enumerate() {
            for &idx in members {
                of_frame[idx] = Some(seq);
            }
        }

        Self {
            sequences,
            of_frame,
        }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Sequence id of the frame at `idx`.
    pub fn sequence_of(&self, idx: usize) -> Option<&str> {
        self.of_frame
            .get(idx)
            .copied()
            .flatten()
            .map(|seq| self.sequences[seq].0.as_str())
    }

    /// Frame positions of every sequence, ordered by sequence id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.sequences
            .iter()
            .map(|(id, members)| (id.as_str(), members.as_slice()))
    }

    /// Demote every composite sibling of the individual frames in `seeds`.
    ///
    /// Runs a work-list until no further frame changes; each sequence is
    /// expanded at most once, so the pass is linear in the number of
    /// sequence members. Returns the positions that were demoted here, in
    /// the order they changed.
    pub fn propagate(
        &self,
        assignments: &mut [StrategyAssignment],
        seeds: impl IntoIterator<Item = usize>,
    ) -> Vec<usize> {
        let mut queue: VecDeque<usize> = seeds.into_iter().collect();
        let mut expanded = vec![false; self.sequences.len()];
        let mut demoted = Vec::new();

        while let Some(idx) = queue.pop_front() {
            if assignments[idx].strategy != Strategy::Individual {
                continue;
            }
            let Some(seq) = self.of_frame.get(idx).copied().flatten() else {
                continue;
            };
            if std::mem::replace(&mut expanded[seq], true) {
                continue;
            }

            let (id, members) = &self.sequences[seq];
            for &sibling in members {
                if assignments[sibling].is_composite() {
                    assignments[sibling].demote(
                        Some(RuleId::SequenceContinuity),
                        format!("{} ({id})", RuleId::SequenceContinuity.reason()),
                    );
                    tracing::trace!(
                        frame_number = assignments[sibling].frame_number,
                        sequence_id = %id,
                        "Demoted by sequence continuity"
                    );
                    demoted.push(sibling);
                    queue.push_back(sibling);
                }
            }
        }

        demoted
    }

    /// The first sequence whose members do not share one strategy, with a
    /// composite and an individual member frame number.
    pub fn find_split(
        &self,
        assignments: &[StrategyAssignment],
    ) -> Option<(&str, FrameNumber, FrameNumber)> {
        self.sequences.iter().find_map(|(id, members)| {
            let composite = members
                .iter()
                .find(|&&idx| assignments[idx].is_composite())?;
            let individual = members
                .iter()
                .find(|&&idx| !assignments[idx].is_composite())?;
            Some((
                id.as_str(),
                assignments[*composite].frame_number,
                assignments[*individual].frame_number,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use crate::frame::{CameraAngle, SequenceRole, ShotType};

    fn action(n: FrameNumber) -> FrameDescriptor {
        FrameDescriptor::new(n, ShotType::Action, CameraAngle::Wide)
    }

    fn scene() -> Vec<FrameDescriptor> {
        vec![
            FrameDescriptor::new(1, ShotType::Action, CameraAngle::ExtremeCloseUp)
                .in_sequence("seq1", SequenceRole::Start),
            action(2).in_sequence("seq1", SequenceRole::Middle),
            action(3).in_sequence("seq1", SequenceRole::End),
            action(4).in_sequence("seq2", SequenceRole::Start),
            action(5).in_sequence("seq2", SequenceRole::End),
            action(6),
        ]
    }

    #[test]
    fn indexes_members_by_position() {
        let index = SequenceIndex::build(&scene());
        assert_eq!(index.len(), 2);
        assert_eq!(index.sequence_of(1), Some("seq1"));
        assert_eq!(index.sequence_of(5), None);
        let ids: Vec<&str> = index.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["seq1", "seq2"]);
    }

    #[test]
    fn propagates_to_all_siblings() {
        let frames = scene();
        let index = SequenceIndex::build(&frames);
        let mut assignments = classify(&frames);

        let demoted = index.propagate(&mut assignments, [0]);

        assert_eq!(demoted, vec![1, 2]);
        assert!(assignments[..3].iter().all(|a| !a.is_composite()));
        assert_eq!(assignments[2].rule, Some(RuleId::SequenceContinuity));
        assert!(assignments[2].reason.contains("seq1"));
        assert!(assignments[3..].iter().all(|a| a.is_composite()));
        assert!(index.find_split(&assignments).is_none());
    }

    #[test]
    fn composite_seed_is_ignored() {
        let frames = scene();
        let index = SequenceIndex::build(&frames);
        let mut assignments = classify(&frames);
        assert!(index.propagate(&mut assignments, [3]).is_empty());
    }

    #[test]
    fn find_split_reports_mixed_sequence() {
        let frames = scene();
        let index = SequenceIndex::build(&frames);
        let assignments = classify(&frames);
        assert_eq!(index.find_split(&assignments), Some(("seq1", 2, 1)));
    }
}
