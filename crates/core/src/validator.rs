//! Final plan validation.
//!
//! Re-checks every rule against a finished plan without touching it. The
//! engine runs this before returning, so a plan that reaches a caller has
//! passed it; callers holding a deserialized plan can run it again.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::error::CoreError;
use crate::frame::{validate_frames, FrameDescriptor};
use crate::grid::GridFormat;
use crate::plan::{CompositeGroup, StrategyAssignment};
use crate::rules::{first_forbidding_rule, mixed_scale_character, RuleId, ScaleProfile};
use crate::scale::ScaleHistory;
use crate::sequence::SequenceIndex;
use crate::types::FrameNumber;

/// Check `assignments` and `groups` against `frames`.
///
/// Returns the first breach found as [`CoreError::StrategyViolation`];
/// structural mismatches between the plan and the frames (wrong count,
/// reordered or unknown frame numbers) are [`CoreError::Validation`].
pub fn validate_plan(
    config: &EngineConfig,
    frames: &[FrameDescriptor],
    history: &ScaleHistory,
    assignments: &[StrategyAssignment],
    groups: &[CompositeGroup],
) -> Result<(), CoreError> {
    validate_frames(frames)?;
    check_alignment(frames, assignments)?;

    let groups_by_id = index_groups(groups)?;
    check_assignments(frames, assignments, &groups_by_id)?;

    let mut owner: Vec<Option<&str>> = vec![None; frames.len()];
    for group in groups {
        check_group_shape(config, group)?;
        for &n in &group.frame_numbers {
            let idx = position(frames, n).ok_or_else(|| {
                CoreError::Validation(format!(
                    "group {} references unknown frame {n}",
                    group.group_id
                ))
            })?;
            if let Some(other) = owner[idx].replace(group.group_id.as_str()) {
                return Err(CoreError::violation(
                    RuleId::GridGeometry,
                    format!("frame {n}"),
                    format!("member of both {other} and {}", group.group_id),
                ));
            }
            let assignment = &assignments[idx];
            if assignment.composite_group_id.as_deref() != Some(group.group_id.as_str()) {
                return Err(CoreError::violation(
                    RuleId::GridGeometry,
                    format!("frame {n}"),
                    format!("listed in {} but not assigned to it", group.group_id),
                ));
            }
        }
    }

    let profiles: Vec<ScaleProfile> = frames.iter().map(|f| f.resolved_scales(history)).collect();
    for group in groups {
        let members = group
            .frame_numbers
            .iter()
            .filter_map(|&n| position(frames, n))
            .map(|idx| &profiles[idx]);
        if let Some((character, buckets)) = mixed_scale_character(members) {
            let scales: Vec<&str> = buckets.iter().map(|b| b.as_str()).collect();
            return Err(CoreError::violation(
                RuleId::MixedScale,
                group.group_id.as_str(),
                format!("character {character} spans {}", scales.join(", ")),
            ));
        }
    }

    let sequences = SequenceIndex::build(frames);
    if let Some((sequence_id, composite, individual)) = sequences.find_split(assignments) {
        return Err(CoreError::violation(
            RuleId::SequenceContinuity,
            format!("sequence {sequence_id}"),
            format!("frame {composite} is composite but frame {individual} is individual"),
        ));
    }

    Ok(())
}

/// Position of `frame_number` in a validated (strictly increasing) scene.
fn position(frames: &[FrameDescriptor], frame_number: FrameNumber) -> Option<usize> {
    frames
        .binary_search_by_key(&frame_number, |f| f.frame_number)
        .ok()
}

fn check_alignment(
    frames: &[FrameDescriptor],
    assignments: &[StrategyAssignment],
) -> Result<(), CoreError> {
    if frames.len() != assignments.len() {
        return Err(CoreError::Validation(format!(
            "{} assignments for {} frames",
            assignments.len(),
            frames.len()
        )));
    }
    for (frame, assignment) in frames.iter().zip(assignments) {
        if frame.frame_number != assignment.frame_number {
            return Err(CoreError::Validation(format!(
                "assignment for frame {} found where frame {} was expected",
                assignment.frame_number, frame.frame_number
            )));
        }
    }
    Ok(())
}

fn index_groups(groups: &[CompositeGroup]) -> Result<BTreeMap<&str, &CompositeGroup>, CoreError> {
    let mut by_id = BTreeMap::new();
    for group in groups {
        if by_id.insert(group.group_id.as_str(), group).is_some() {
            return Err(CoreError::violation(
                RuleId::GridGeometry,
                group.group_id.as_str(),
                "group id used more than once",
            ));
        }
    }
    Ok(by_id)
}

/// Frame-level rules on composite frames, and group references both ways.
fn check_assignments(
    frames: &[FrameDescriptor],
    assignments: &[StrategyAssignment],
    groups: &BTreeMap<&str, &CompositeGroup>,
) -> Result<(), CoreError> {
    for (frame, assignment) in frames.iter().zip(assignments) {
        let n = frame.frame_number;
        let group_id = assignment.composite_group_id.as_deref();

        if !assignment.is_composite() {
            if let Some(id) = group_id {
                return Err(CoreError::violation(
                    RuleId::GridGeometry,
                    format!("frame {n}"),
                    format!("individual frame still references group {id}"),
                ));
            }
            continue;
        }

        if let Some(rule) = first_forbidding_rule(frame) {
            return Err(CoreError::violation(
                rule,
                format!("frame {n}"),
                format!("composite frame is forbidden: {}", rule.reason()),
            ));
        }

        let Some(id) = group_id else {
            return Err(CoreError::violation(
                RuleId::GridGeometry,
                format!("frame {n}"),
                "composite frame has no group",
            ));
        };
        match groups.get(id) {
            Some(group) if group.contains(n) => {}
            Some(_) => {
                return Err(CoreError::violation(
                    RuleId::GridGeometry,
                    format!("frame {n}"),
                    format!("assigned to {id} but not one of its members"),
                ))
            }
            None => {
                return Err(CoreError::violation(
                    RuleId::GridGeometry,
                    format!("frame {n}"),
                    format!("assigned to unknown group {id}"),
                ))
            }
        }
    }
    Ok(())
}

/// Member count matches an enabled geometry and members are in fill order.
fn check_group_shape(config: &EngineConfig, group: &CompositeGroup) -> Result<(), CoreError> {
    let count = group.frame_numbers.len();
    match GridFormat::for_count(count) {
        Some(format) if format == group.grid_format => {}
        _ => {
            return Err(CoreError::violation(
                RuleId::GridGeometry,
                group.group_id.as_str(),
                format!("{count} members do not fill a {} grid", group.grid_format),
            ))
        }
    }
    if !config.supports(group.grid_format) {
        return Err(CoreError::violation(
            RuleId::GridGeometry,
            group.group_id.as_str(),
            format!("{} grids are not enabled", group.grid_format),
        ));
    }
    let ordered = group.frame_numbers.windows(2).all(|w| w[0] < w[1]);
    let unique: BTreeSet<FrameNumber> = group.frame_numbers.iter().copied().collect();
    if !ordered || unique.len() != count {
        return Err(CoreError::violation(
            RuleId::GridGeometry,
            group.group_id.as_str(),
            "members are not in frame order",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::frame::{CameraAngle, SequenceRole, ShotType};
    use crate::plan::Strategy;
    use crate::scale::ScaleBucket;

    fn wide(n: FrameNumber) -> FrameDescriptor {
        FrameDescriptor::new(n, ShotType::Establishing, CameraAngle::Wide)
    }

    fn grouped(n: FrameNumber, id: &str) -> StrategyAssignment {
        StrategyAssignment {
            composite_group_id: Some(id.to_string()),
            ..StrategyAssignment::eligible(n)
        }
    }

    fn group(id: &str, frame_numbers: Vec<FrameNumber>, grid_format: GridFormat) -> CompositeGroup {
        CompositeGroup {
            group_id: id.to_string(),
            frame_numbers,
            grid_format,
        }
    }

    /// Four wide frames in one 2x2 grid.
    fn valid_plan() -> (Vec<FrameDescriptor>, Vec<StrategyAssignment>, Vec<CompositeGroup>) {
        let frames: Vec<_> = (1..=4).map(wide).collect();
        let assignments = (1..=4).map(|n| grouped(n, "composite_001")).collect();
        let groups = vec![group("composite_001", vec![1, 2, 3, 4], GridFormat::TwoByTwo)];
        (frames, assignments, groups)
    }

    fn check(
        frames: &[FrameDescriptor],
        assignments: &[StrategyAssignment],
        groups: &[CompositeGroup],
    ) -> Result<(), CoreError> {
        validate_plan(
            &EngineConfig::default(),
            frames,
            &ScaleHistory::new(),
            assignments,
            groups,
        )
    }

    // -- acceptance -------------------------------------------------------------

    #[test]
    fn accepts_valid_plan() {
        let (frames, assignments, groups) = valid_plan();
        check(&frames, &assignments, &groups).unwrap();
    }

    #[test]
    fn accepts_empty_scene() {
        check(&[], &[], &[]).unwrap();
    }

    #[test]
    fn accepts_all_individual_plan() {
        let frames: Vec<_> = (1..=3).map(wide).collect();
        let assignments: Vec<_> = (1..=3)
            .map(|n| StrategyAssignment::forced(n, RuleId::GridGeometry))
            .collect();
        check(&frames, &assignments, &[]).unwrap();
    }

    // -- structure --------------------------------------------------------------

    #[test]
    fn rejects_assignment_count_mismatch() {
        let (frames, mut assignments, groups) = valid_plan();
        assignments.pop();
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn rejects_misaligned_assignments() {
        let (frames, mut assignments, groups) = valid_plan();
        assignments.swap(0, 1);
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::Validation(_))
        );
    }

    // -- frame-level rules ------------------------------------------------------

    #[test]
    fn rejects_forbidden_frame_in_group() {
        let (mut frames, assignments, groups) = valid_plan();
        frames[1] = FrameDescriptor::new(2, ShotType::Dialogue, CameraAngle::CloseUp).with_dialogue();
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::DialogueCloseup, subject, .. })
                if subject == "frame 2"
        );
    }

    // -- geometry ---------------------------------------------------------------

    #[test]
    fn rejects_count_not_matching_format() {
        let frames: Vec<_> = (1..=5).map(wide).collect();
        let assignments: Vec<_> = (1..=5).map(|n| grouped(n, "composite_001")).collect();
        let groups = vec![group("composite_001", vec![1, 2, 3, 4, 5], GridFormat::TwoByThree)];
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, .. })
        );
    }

    #[test]
    fn rejects_disabled_format() {
        let (frames, assignments, groups) = valid_plan();
        let config = EngineConfig::parse_grid_formats("3x3,2x3").unwrap();
        assert_matches!(
            validate_plan(&config, &frames, &ScaleHistory::new(), &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, detail, .. })
                if detail.contains("not enabled")
        );
    }

    #[test]
    fn rejects_out_of_order_members() {
        let (frames, assignments, mut groups) = valid_plan();
        groups[0].frame_numbers = vec![1, 3, 2, 4];
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, .. })
        );
    }

    #[test]
    fn rejects_composite_frame_without_group() {
        let (frames, mut assignments, groups) = valid_plan();
        assignments[2].composite_group_id = None;
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, subject, .. })
                if subject == "frame 3"
        );
    }

    #[test]
    fn rejects_individual_frame_with_group() {
        let (frames, mut assignments, groups) = valid_plan();
        assignments[0].strategy = Strategy::Individual;
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, .. })
        );
    }

    #[test]
    fn rejects_unknown_group_reference() {
        let (frames, mut assignments, groups) = valid_plan();
        assignments[3].composite_group_id = Some("composite_009".into());
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, detail, .. })
                if detail.contains("composite_009")
        );
    }

    #[test]
    fn rejects_frame_in_two_groups() {
        let frames: Vec<_> = (1..=7).map(wide).collect();
        let mut assignments: Vec<_> = (1..=4).map(|n| grouped(n, "composite_001")).collect();
        assignments.extend((5..=7).map(|n| grouped(n, "composite_002")));
        let groups = vec![
            group("composite_001", vec![1, 2, 3, 4], GridFormat::TwoByTwo),
            group("composite_002", vec![4, 5, 6, 7], GridFormat::TwoByTwo),
        ];
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::GridGeometry, subject, .. })
                if subject == "frame 4"
        );
    }

    // -- group-level rules ------------------------------------------------------

    #[test]
    fn rejects_mixed_scale_group() {
        let (mut frames, assignments, groups) = valid_plan();
        frames[0] = wide(1).with_character("x", ScaleBucket::Tiny);
        frames[3] = wide(4).with_character("x", ScaleBucket::VeryLarge);
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::MixedScale, subject, detail })
                if subject == "composite_001" && detail.contains("tiny, very_large")
        );
    }

    #[test]
    fn mixed_scale_uses_history() {
        let (mut frames, assignments, groups) = valid_plan();
        frames[0] = wide(1).with_character("x", ScaleBucket::Tiny);
        frames[3] = wide(4).with_presence(crate::frame::CharacterPresence {
            character_id: "x".into(),
            scale: None,
            face_height_px: None,
        });
        let history = ScaleHistory::new().with("x", 4, ScaleBucket::Large);
        assert_matches!(
            validate_plan(&EngineConfig::default(), &frames, &history, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::MixedScale, .. })
        );
    }

    #[test]
    fn rejects_split_sequence() {
        let frames: Vec<_> = (1..=5)
            .map(|n| match n {
                4 => wide(n).in_sequence("seq1", SequenceRole::Start),
                5 => wide(n).in_sequence("seq1", SequenceRole::End),
                _ => wide(n),
            })
            .collect();
        let mut assignments: Vec<_> = (1..=4).map(|n| grouped(n, "composite_001")).collect();
        assignments.push(StrategyAssignment::forced(5, RuleId::GridGeometry));
        let groups = vec![group("composite_001", vec![1, 2, 3, 4], GridFormat::TwoByTwo)];
        assert_matches!(
            check(&frames, &assignments, &groups),
            Err(CoreError::StrategyViolation { rule: RuleId::SequenceContinuity, subject, .. })
                if subject == "sequence seq1"
        );
    }
}
