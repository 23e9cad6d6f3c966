//! Plan statistics and planning recommendations.
//!
//! [`PlanStatistics`] is the accumulator threaded through grouping and
//! returned with every plan. It counts generation calls, not money.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grid::GridFormat;
use crate::plan::{CompositeGroup, StrategyAssignment};
use crate::rules::RuleId;
use crate::types::FrameNumber;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Share of individual frames above which a scene is flagged as mostly
/// individual.
pub const MOSTLY_INDIVIDUAL_RATIO: f64 = 0.8;

/// Dialogue run count above which the scene is flagged.
pub const MANY_DIALOGUE_SEQUENCES: usize = 3;

// ---------------------------------------------------------------------------
// PlanStatistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStatistics {
    pub total_frames: usize,
    pub individual_frames: usize,
    pub composite_groups: usize,
    pub frames_in_composites: usize,
    /// One call per individual frame plus one per composite group.
    pub generation_calls: usize,
    /// Individual frames keyed by the rule that forced them.
    pub individual_by_rule: BTreeMap<RuleId, usize>,
    pub groups_by_format: BTreeMap<GridFormat, usize>,
    /// Groups broken up by continuity demotions and repacked.
    pub dissolved_groups: usize,
    /// Closure passes that had to repack frames.
    pub repack_passes: usize,
}

impl PlanStatistics {
    /// Fill the frame and group counts from the final assignments.
    pub(crate) fn tally(&mut self, assignments: &[StrategyAssignment], groups: &[CompositeGroup]) {
        self.total_frames = assignments.len();
        self.individual_frames = 0;
        self.individual_by_rule.clear();
        for assignment in assignments.iter().filter(|a| !a.is_composite()) {
            self.individual_frames += 1;
            if let Some(rule) = assignment.rule {
                *self.individual_by_rule.entry(rule).or_default() += 1;
            }
        }

        self.composite_groups = groups.len();
        self.frames_in_composites = groups.iter().map(|g| g.frame_numbers.len()).sum();
        self.groups_by_format.clear();
        for group in groups {
            *self.groups_by_format.entry(group.grid_format).or_default() += 1;
        }

        self.generation_calls = self.individual_frames + self.composite_groups;
    }

    /// Frames per generation call; 0 for an empty scene.
    pub fn frames_per_call(&self) -> f64 {
        if self.generation_calls == 0 {
            return 0.0;
        }
        self.total_frames as f64 / self.generation_calls as f64
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// Advisory notes for the scene planner. Never affects the plan itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    MostlyIndividual {
        individual_frames: usize,
        total_frames: usize,
    },
    NoCompositeGroups,
    ManyDialogueSequences {
        count: usize,
    },
}

impl Recommendation {
    pub fn message(&self) -> String {
        match self {
            Self::MostlyIndividual {
                individual_frames,
                total_frames,
            } => format!(
                "{individual_frames} of {total_frames} frames need individual generation; \
                 consider simplifying close-ups to reduce generation calls"
            ),
            Self::NoCompositeGroups => {
                "No composite grids possible; every frame is generated individually".to_string()
            }
            Self::ManyDialogueSequences { count } => format!(
                "Scene has {count} dialogue sequences; make sure character reference images are high quality"
            ),
        }
    }
}

/// Derive recommendations from final statistics and dialogue runs.
pub fn recommend(stats: &PlanStatistics, dialogue_sequences: &[Vec<FrameNumber>]) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if stats.total_frames == 0 {
        return out;
    }

    if stats.individual_frames as f64 > stats.total_frames as f64 * MOSTLY_INDIVIDUAL_RATIO {
        out.push(Recommendation::MostlyIndividual {
            individual_frames: stats.individual_frames,
            total_frames: stats.total_frames,
        });
    }
    if stats.composite_groups == 0 {
        out.push(Recommendation::NoCompositeGroups);
    }
    if dialogue_sequences.len() > MANY_DIALOGUE_SEQUENCES {
        out.push(Recommendation::ManyDialogueSequences {
            count: dialogue_sequences.len(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Strategy;

    fn individual(n: FrameNumber, rule: RuleId) -> StrategyAssignment {
        StrategyAssignment::forced(n, rule)
    }

    fn grouped(n: FrameNumber) -> StrategyAssignment {
        StrategyAssignment {
            composite_group_id: Some("composite_001".into()),
            ..StrategyAssignment::eligible(n)
        }
    }

    #[test]
    fn tally_counts_calls_and_rules() {
        let mut assignments: Vec<StrategyAssignment> = (1..=4).map(grouped).collect();
        assignments.push(individual(5, RuleId::DialogueCloseup));
        assignments.push(individual(6, RuleId::DialogueCloseup));
        assignments.push(individual(7, RuleId::GridGeometry));
        let groups = vec![CompositeGroup {
            group_id: "composite_001".into(),
            frame_numbers: vec![1, 2, 3, 4],
            grid_format: GridFormat::TwoByTwo,
        }];

        let mut stats = PlanStatistics::default();
        stats.tally(&assignments, &groups);

        assert_eq!(stats.total_frames, 7);
        assert_eq!(stats.individual_frames, 3);
        assert_eq!(stats.composite_groups, 1);
        assert_eq!(stats.frames_in_composites, 4);
        assert_eq!(stats.generation_calls, 4);
        assert_eq!(stats.individual_by_rule[&RuleId::DialogueCloseup], 2);
        assert_eq!(stats.individual_by_rule[&RuleId::GridGeometry], 1);
        assert_eq!(stats.groups_by_format[&GridFormat::TwoByTwo], 1);
        assert!((stats.frames_per_call() - 1.75).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_scene_has_no_recommendations() {
        assert!(recommend(&PlanStatistics::default(), &[]).is_empty());
        assert_eq!(PlanStatistics::default().frames_per_call(), 0.0);
    }

    #[test]
    fn all_individual_scene_gets_both_warnings() {
        let assignments: Vec<StrategyAssignment> =
            (1..=3).map(|n| individual(n, RuleId::GridGeometry)).collect();
        let mut stats = PlanStatistics::default();
        stats.tally(&assignments, &[]);
        assert!(assignments.iter().all(|a| a.strategy == Strategy::Individual));

        let recs = recommend(&stats, &[]);
        assert_eq!(
            recs,
            vec![
                Recommendation::MostlyIndividual {
                    individual_frames: 3,
                    total_frames: 3
                },
                Recommendation::NoCompositeGroups,
            ]
        );
    }

    #[test]
    fn many_dialogue_sequences_flagged() {
        let stats = PlanStatistics {
            total_frames: 20,
            individual_frames: 8,
            composite_groups: 2,
            ..Default::default()
        };
        let runs = vec![vec![1, 2], vec![4, 5], vec![7, 8], vec![10, 11]];
        let recs = recommend(&stats, &runs);
        assert_eq!(recs, vec![Recommendation::ManyDialogueSequences { count: 4 }]);
        assert!(recs[0].message().contains("4 dialogue sequences"));
    }

    #[test]
    fn recommendation_serializes_with_kind_tag() {
        let json = serde_json::to_value(Recommendation::NoCompositeGroups).unwrap();
        assert_eq!(json["kind"], "no_composite_groups");
    }
}
