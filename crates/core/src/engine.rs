//! Strategy engine entry point.
//!
//! One call plans one scene: validate the input, classify frames, group
//! the composite candidates, and validate the result. The engine keeps no
//! state between calls, so one instance can serve any number of scenes
//! from any number of threads.

use crate::classifier::classify;
use crate::config::EngineConfig;
use crate::dialogue::dialogue_runs;
use crate::error::CoreError;
use crate::frame::{validate_frames, FrameDescriptor};
use crate::grouper::group_frames;
use crate::plan::ScenePlan;
use crate::rules::ScaleProfile;
use crate::scale::ScaleHistory;
use crate::sequence::SequenceIndex;
use crate::stats::{recommend, PlanStatistics};
use crate::validator::validate_plan;

#[derive(Debug, Clone, Default)]
pub struct StrategyEngine {
    config: EngineConfig,
}

impl StrategyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Plan a scene with no scale history.
    pub fn plan_scene(&self, frames: &[FrameDescriptor]) -> Result<ScenePlan, CoreError> {
        self.plan_scene_with_history(frames, &ScaleHistory::new())
    }

    /// Plan a scene, resolving unsized character presences from `history`.
    ///
    /// Fails with [`CoreError::InvalidFrameDescriptor`] on malformed input
    /// and with [`CoreError::StrategyViolation`] if the finished plan does
    /// not pass [`validate_plan`]; no partial plan is returned either way.
    pub fn plan_scene_with_history(
        &self,
        frames: &[FrameDescriptor],
        history: &ScaleHistory,
    ) -> Result<ScenePlan, CoreError> {
        let span = tracing::debug_span!("plan_scene", frames = frames.len());
        let _enter = span.enter();

        validate_frames(frames)?;

        let profiles: Vec<ScaleProfile> = frames.iter().map(|f| f.resolved_scales(history)).collect();
        let sequences = SequenceIndex::build(frames);
        let mut assignments = classify(frames);

        let mut statistics = PlanStatistics::default();
        let groups = group_frames(
            &self.config,
            &profiles,
            &sequences,
            &mut assignments,
            &mut statistics,
        );
        statistics.tally(&assignments, &groups);

        validate_plan(&self.config, frames, history, &assignments, &groups)?;

        let dialogue_sequences = dialogue_runs(frames);
        let recommendations = recommend(&statistics, &dialogue_sequences);

        tracing::debug!(
            individual = statistics.individual_frames,
            groups = statistics.composite_groups,
            generation_calls = statistics.generation_calls,
            dissolved_groups = statistics.dissolved_groups,
            "Scene planned"
        );

        Ok(ScenePlan {
            assignments,
            groups,
            statistics,
            dialogue_sequences,
            recommendations,
        })
    }

    /// Re-run the validator over a plan produced earlier for `frames`.
    pub fn validate(
        &self,
        frames: &[FrameDescriptor],
        history: &ScaleHistory,
        plan: &ScenePlan,
    ) -> Result<(), CoreError> {
        validate_plan(&self.config, frames, history, &plan.assignments, &plan.groups)
    }
}

/// Plan a scene with the default configuration and no scale history.
pub fn plan_scene(frames: &[FrameDescriptor]) -> Result<ScenePlan, CoreError> {
    StrategyEngine::default().plan_scene(frames)
}
