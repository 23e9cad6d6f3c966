//! Batch planning.
//!
//! A batch file holds any number of independent scenes. Each scene is
//! planned on its own blocking task, at most `workers` at a time, and the
//! report lists scenes in input order regardless of completion order.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use framegen_core::plan::AnnotatedFrame;
use framegen_core::types::FrameNumber;
use framegen_core::{
    CompositeGroup, FrameDescriptor, PlanStatistics, Recommendation, ScaleHistory, ScenePlan,
    StrategyEngine,
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;

use crate::config::WorkerConfig;
use crate::error::WorkerError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One scene as produced by the storyboard planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneInput {
    pub scene_id: String,
    pub frames: Vec<FrameDescriptor>,
    #[serde(default, skip_serializing_if = "ScaleHistory::is_empty")]
    pub scale_history: ScaleHistory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    pub scenes: Vec<SceneInput>,
}

/// Read and parse a batch file.
pub async fn read_batch(path: &Path) -> Result<Vec<SceneInput>, WorkerError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|e| WorkerError::io(path, e))?;
    let batch: BatchInput = serde_json::from_slice(&raw)?;
    Ok(batch.scenes)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A planned scene: the input frames and the plan made for them.
#[derive(Debug, Clone)]
pub struct SceneOutput {
    pub scene_id: String,
    pub frames: Vec<FrameDescriptor>,
    pub plan: ScenePlan,
}

/// Serialized form of one planned scene.
#[derive(Debug, Serialize)]
pub struct SceneReport<'a> {
    pub scene_id: &'a str,
    pub frames: Vec<AnnotatedFrame<'a>>,
    pub composite_groups: &'a [CompositeGroup],
    pub statistics: &'a PlanStatistics,
    pub dialogue_sequences: &'a [Vec<FrameNumber>],
    pub recommendations: &'a [Recommendation],
}

impl SceneOutput {
    pub fn report(&self) -> SceneReport<'_> {
        SceneReport {
            scene_id: &self.scene_id,
            frames: self.plan.annotate(&self.frames),
            composite_groups: &self.plan.groups,
            statistics: &self.plan.statistics,
            dialogue_sequences: &self.plan.dialogue_sequences,
            recommendations: &self.plan.recommendations,
        }
    }
}

/// Totals across every scene of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchTotals {
    pub scenes: usize,
    pub frames: usize,
    pub individual_frames: usize,
    pub composite_groups: usize,
    pub generation_calls: usize,
}

impl BatchTotals {
    pub fn of(outputs: &[SceneOutput]) -> Self {
        outputs.iter().fold(
            Self {
                scenes: outputs.len(),
                ..Default::default()
            },
            |mut acc, out| {
                let stats = &out.plan.statistics;
                acc.frames += stats.total_frames;
                acc.individual_frames += stats.individual_frames;
                acc.composite_groups += stats.composite_groups;
                acc.generation_calls += stats.generation_calls;
                acc
            },
        )
    }
}

#[derive(Debug, Serialize)]
struct BatchReport<'a> {
    totals: BatchTotals,
    scenes: Vec<SceneReport<'a>>,
}

/// Render the JSON report for a planned batch.
pub fn render_report(outputs: &[SceneOutput]) -> Result<String, WorkerError> {
    let report = BatchReport {
        totals: BatchTotals::of(outputs),
        scenes: outputs.iter().map(SceneOutput::report).collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Write the report to `path`, or to stdout when `path` is `None`.
pub async fn write_report(outputs: &[SceneOutput], path: Option<&Path>) -> Result<(), WorkerError> {
    let mut json = render_report(outputs)?;
    json.push('\n');

    match path {
        Some(path) => tokio::fs::write(path, json)
            .await
            .map_err(|e| WorkerError::io(path, e)),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(json.as_bytes())
                .await
                .map_err(|e| WorkerError::io("<stdout>", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| WorkerError::io("<stdout>", e))
        }
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Plan every scene of a batch, `config.workers` scenes at a time.
///
/// Outputs are returned in input order. The first scene that fails to plan
/// fails the whole batch with [`WorkerError::Scene`]; scenes still queued
/// are not started.
pub async fn run_batch(
    scenes: Vec<SceneInput>,
    config: &WorkerConfig,
) -> Result<Vec<SceneOutput>, WorkerError> {
    let mut seen = HashSet::new();
    for scene in &scenes {
        if !seen.insert(scene.scene_id.as_str()) {
            return Err(WorkerError::DuplicateScene(scene.scene_id.clone()));
        }
    }

    let engine = Arc::new(StrategyEngine::new(config.engine.clone()));
    let workers = config.workers.max(1);
    let mut results: Vec<Option<SceneOutput>> = Vec::new();
    results.resize_with(scenes.len(), || None);

    let mut pending = scenes.into_iter().enumerate();
    let mut tasks = JoinSet::new();

    loop {
        while tasks.len() < workers {
            let Some((idx, scene)) = pending.next() else {
                break;
            };
            let engine = Arc::clone(&engine);
            tasks.spawn_blocking(move || (idx, plan_one(&engine, scene)));
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (idx, outcome) = joined?;
        results[idx] = Some(outcome?);
    }

    Ok(results.into_iter().flatten().collect())
}

fn plan_one(engine: &StrategyEngine, scene: SceneInput) -> Result<SceneOutput, WorkerError> {
    let SceneInput {
        scene_id,
        frames,
        scale_history,
    } = scene;

    let plan = match engine.plan_scene_with_history(&frames, &scale_history) {
        Ok(plan) => plan,
        Err(source) => {
            tracing::error!(scene_id = %scene_id, error = %source, "Scene planning failed");
            return Err(WorkerError::Scene { scene_id, source });
        }
    };

    let stats = &plan.statistics;
    tracing::info!(
        scene_id = %scene_id,
        frames = stats.total_frames,
        individual = stats.individual_frames,
        groups = stats.composite_groups,
        generation_calls = stats.generation_calls,
        "Scene planned"
    );
    for recommendation in &plan.recommendations {
        tracing::info!(scene_id = %scene_id, "{}", recommendation.message());
    }

    Ok(SceneOutput {
        scene_id,
        frames,
        plan,
    })
}
