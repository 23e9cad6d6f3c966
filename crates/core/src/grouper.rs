//! Composite grid grouping.
//!
//! Packs provisionally composite frames into grid groups:
//!
//! 1. Split the composite candidates (in frame order) into runs; a frame
//!    whose character scale conflicts with any member of the current run
//!    starts a new run.
//! 2. Cut each run into groups, largest enabled grid first. Frames left
//!    over below the smallest grid become individual.
//! 3. Close over sequence continuity: demotions may force sequence
//!    siblings to individual, which breaks the groups they sat in. The
//!    surviving members of broken groups are pooled, cleared of scale
//!    conflicts, and packed again, until a pass demotes nothing new.
//!
//! Every pass only moves frames from composite to individual, so the
//! closure terminates after at most one pass per frame.

use crate::config::EngineConfig;
use crate::grid::GridFormat;
use crate::plan::{CompositeGroup, StrategyAssignment};
use crate::rules::{resolve_mixed_scale, scale_conflict, RuleId, ScaleProfile};
use crate::sequence::SequenceIndex;
use crate::stats::PlanStatistics;
use crate::types::FrameNumber;

/// Format of generated group ids.
pub fn group_id(ordinal: usize) -> String {
    format!("composite_{ordinal:03}")
}

struct PendingGroup {
    members: Vec<usize>,
    format: GridFormat,
}

struct Grouper<'a> {
    config: &'a EngineConfig,
    profiles: &'a [ScaleProfile],
    sequences: &'a SequenceIndex,
    assignments: &'a mut [StrategyAssignment],
    stats: &'a mut PlanStatistics,
    groups: Vec<Option<PendingGroup>>,
    membership: Vec<Option<usize>>,
}

/// Group the composite candidates in `assignments`.
///
/// `profiles` holds the resolved character scales of every frame, by
/// position. On return every assignment is final: composite frames carry
/// the id of the group they belong to.
pub fn group_frames(
    config: &EngineConfig,
    profiles: &[ScaleProfile],
    sequences: &SequenceIndex,
    assignments: &mut [StrategyAssignment],
    stats: &mut PlanStatistics,
) -> Vec<CompositeGroup> {
    let frame_count = assignments.len();
    let mut grouper = Grouper {
        config,
        profiles,
        sequences,
        assignments,
        stats,
        groups: Vec::new(),
        membership: vec![None; frame_count],
    };

    let forced: Vec<usize> = (0..frame_count)
        .filter(|&idx| !grouper.assignments[idx].is_composite())
        .collect();
    sequences.propagate(grouper.assignments, forced);

    let candidates: Vec<usize> = (0..frame_count)
        .filter(|&idx| grouper.assignments[idx].is_composite())
        .collect();

    let mut worklist = Vec::new();
    for run in partition_runs(&candidates, profiles) {
        worklist.extend(grouper.pack(&run));
    }
    grouper.close(worklist);
    grouper.finish()
}

/// Split candidate positions into runs free of pairwise scale conflicts.
fn partition_runs(candidates: &[usize], profiles: &[ScaleProfile]) -> Vec<Vec<usize>> {
    let mut runs = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for &idx in candidates {
        let conflict = current
            .iter()
            .find_map(|&member| scale_conflict(&profiles[member], &profiles[idx]));
        if let Some(conflict) = conflict {
            tracing::trace!(
                position = idx,
                character_id = %conflict.character_id,
                "Scale conflict starts a new run"
            );
            runs.push(std::mem::take(&mut current));
        }
        current.push(idx);
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

impl Grouper<'_> {
    /// Cut `frames` into groups, largest grid first, and demote what is
    /// left. Returns the demoted positions.
    fn pack(&mut self, frames: &[usize]) -> Vec<usize> {
        let mut rest = frames;
        while let Some(format) = self.config.largest_fitting(rest.len()) {
            let (members, tail) = rest.split_at(format.capacity());
            let slot = self.groups.len();
            for &idx in members {
                self.membership[idx] = Some(slot);
            }
            self.groups.push(Some(PendingGroup {
                members: members.to_vec(),
                format,
            }));
            rest = tail;
        }

        for &idx in rest {
            self.assignments[idx]
                .demote(Some(RuleId::GridGeometry), RuleId::GridGeometry.reason());
        }
        if !rest.is_empty() {
            tracing::debug!(count = rest.len(), "Demoted packing leftovers to individual");
        }
        rest.to_vec()
    }

    /// Sequence-continuity closure over the whole scene.
    fn close(&mut self, mut worklist: Vec<usize>) {
        loop {
            let demoted = self
                .sequences
                .propagate(self.assignments, std::mem::take(&mut worklist));
            if demoted.is_empty() {
                break;
            }

            let mut pool = Vec::new();
            for idx in demoted {
                let Some(slot) = self.membership[idx] else {
                    continue;
                };
                let Some(group) = self.groups[slot].take() else {
                    continue;
                };
                self.stats.dissolved_groups += 1;
                for member in group.members {
                    self.membership[member] = None;
                    if self.assignments[member].is_composite() {
                        pool.push(member);
                    }
                }
            }
            if pool.is_empty() {
                continue;
            }
            pool.sort_unstable();
            self.stats.repack_passes += 1;

            worklist.extend(self.drop_scale_conflicts(&mut pool));
            worklist.extend(self.pack(&pool));
        }
    }

    /// Demote pool members until no character spans incompatible scales.
    fn drop_scale_conflicts(&mut self, pool: &mut Vec<usize>) -> Vec<usize> {
        let profiles = self.profiles;
        let members: Vec<(FrameNumber, &ScaleProfile)> = pool
            .iter()
            .map(|&idx| (self.assignments[idx].frame_number, &profiles[idx]))
            .collect();
        let dropped = resolve_mixed_scale(&members);
        if dropped.is_empty() {
            return Vec::new();
        }

        let mut demoted = Vec::new();
        pool.retain(|&idx| {
            let assignment = &mut self.assignments[idx];
            if dropped.contains(&assignment.frame_number) {
                assignment.demote(Some(RuleId::MixedScale), RuleId::MixedScale.reason());
                demoted.push(idx);
                false
            } else {
                true
            }
        });
        tracing::debug!(count = demoted.len(), "Demoted mixed-scale frames from repack pool");
        demoted
    }

    /// Number the surviving groups in frame order and stamp their ids.
    fn finish(self) -> Vec<CompositeGroup> {
        let mut live: Vec<PendingGroup> = self.groups.into_iter().flatten().collect();
        live.sort_by_key(|g| g.members[0]);

        live.into_iter()
            .enumerate()
            .map(|(ordinal, group)| {
                let id = group_id(ordinal + 1);
                let frame_numbers = group
                    .members
                    .iter()
                    .map(|&idx| {
                        let assignment = &mut self.assignments[idx];
                        assignment.composite_group_id = Some(id.clone());
                        assignment.reason = format!("batched into {id} ({} grid)", group.format);
                        assignment.frame_number
                    })
                    .collect();
                CompositeGroup {
                    group_id: id,
                    frame_numbers,
                    grid_format: group.format,
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
