//! Integration tests for batch planning.
//!
//! Runs batches through [`run_batch`] on the tokio runtime and exercises
//! the batch file round trip with temporary files.

use std::collections::HashMap;
use std::io::Write;

use assert_matches::assert_matches;
use framegen_core::{CameraAngle, CoreError, FrameDescriptor, ShotType, Strategy};
use framegen_worker::{read_batch, render_report, run_batch, write_report, SceneInput, WorkerConfig, WorkerError};

fn config(workers: &str) -> WorkerConfig {
    let env: HashMap<&str, String> = HashMap::from([
        ("FRAMEGEN_INPUT", "unused.json".to_string()),
        ("FRAMEGEN_WORKERS", workers.to_string()),
    ]);
    WorkerConfig::from_lookup(|key| env.get(key).cloned()).expect("valid test config")
}

fn wide_scene(scene_id: &str, frames: u32) -> SceneInput {
    SceneInput {
        scene_id: scene_id.to_string(),
        frames: (1..=frames)
            .map(|n| FrameDescriptor::new(n, ShotType::Establishing, CameraAngle::Wide))
            .collect(),
        scale_history: Default::default(),
    }
}

// ---------------------------------------------------------------------------
// Test: run_batch
// ---------------------------------------------------------------------------

/// Outputs come back in input order even when scenes finish out of order.
#[tokio::test]
async fn outputs_preserve_input_order() {
    let scenes: Vec<SceneInput> = (0..12)
        .map(|i| wide_scene(&format!("scene-{i:02}"), 1 + (i * 7) % 30))
        .collect();
    let expected: Vec<String> = scenes.iter().map(|s| s.scene_id.clone()).collect();

    let outputs = run_batch(scenes, &config("3")).await.unwrap();

    let ids: Vec<String> = outputs.iter().map(|o| o.scene_id.clone()).collect();
    assert_eq!(ids, expected);
    for output in &outputs {
        assert_eq!(output.frames.len(), output.plan.assignments.len());
    }
}

/// A nine-frame wide scene plans to one composite call.
#[tokio::test]
async fn single_scene_is_planned() {
    let outputs = run_batch(vec![wide_scene("intro", 9)], &config("1")).await.unwrap();

    assert_eq!(outputs.len(), 1);
    let plan = &outputs[0].plan;
    assert_eq!(plan.groups.len(), 1);
    assert!(plan.assignments.iter().all(|a| a.strategy == Strategy::Composite));
}

/// An empty batch is not an error.
#[tokio::test]
async fn empty_batch_yields_no_outputs() {
    assert!(run_batch(Vec::new(), &config("2")).await.unwrap().is_empty());
}

/// A malformed scene fails the batch and names the scene.
#[tokio::test]
async fn invalid_scene_fails_batch_with_its_id() {
    let mut broken = wide_scene("broken", 3);
    broken.frames[2].frame_number = 1;
    let scenes = vec![wide_scene("ok", 4), broken];

    let err = run_batch(scenes, &config("2")).await.unwrap_err();
    assert_matches!(
        &err,
        WorkerError::Scene { scene_id, source: CoreError::InvalidFrameDescriptor { .. } }
            if scene_id == "broken"
    );
    assert!(err.to_string().starts_with("Scene broken:"));
}

/// Scene ids must be unique within a batch.
#[tokio::test]
async fn duplicate_scene_ids_rejected() {
    let scenes = vec![wide_scene("a", 4), wide_scene("a", 5)];
    assert_matches!(
        run_batch(scenes, &config("2")).await,
        Err(WorkerError::DuplicateScene(id)) if id == "a"
    );
}

// ---------------------------------------------------------------------------
// Test: batch files
// ---------------------------------------------------------------------------

/// A batch file is read, planned and written back as an annotated report.
#[tokio::test]
async fn batch_file_round_trip() {
    let mut input = tempfile::NamedTempFile::new().expect("create input file");
    write!(
        input,
        r#"{{"scenes": [
            {{"scene_id": "s1", "frames": [
                {{"frame_number": 1, "shot_type": "dialogue", "camera_angle": "close-up", "has_dialogue": true}},
                {{"frame_number": 2, "shot_type": "establishing", "camera_angle": "wide"}},
                {{"frame_number": 3, "shot_type": "establishing", "camera_angle": "wide"}},
                {{"frame_number": 4, "shot_type": "establishing", "camera_angle": "wide"}},
                {{"frame_number": 5, "shot_type": "establishing", "camera_angle": "wide"}}
            ]}}
        ]}}"#
    )
    .expect("write input file");

    let scenes = read_batch(input.path()).await.unwrap();
    assert_eq!(scenes.len(), 1);
    assert!(scenes[0].scale_history.is_empty());

    let outputs = run_batch(scenes, &config("1")).await.unwrap();

    let dir = tempfile::tempdir().expect("create output dir");
    let out_path = dir.path().join("plan.json");
    write_report(&outputs, Some(&out_path)).await.unwrap();

    let written = std::fs::read_to_string(&out_path).expect("read report");
    let report: serde_json::Value = serde_json::from_str(&written).expect("report is json");

    assert_eq!(report["totals"]["scenes"], 1);
    assert_eq!(report["totals"]["generation_calls"], 2);
    let frames = &report["scenes"][0]["frames"];
    assert_eq!(frames[0]["strategy"], "individual");
    assert_eq!(frames[0]["rule"], "dialogue_closeup");
    assert!(frames[0]["composite_group_id"].is_null());
    assert_eq!(frames[1]["strategy"], "composite");
    assert_eq!(frames[1]["composite_group_id"], "composite_001");
    assert_eq!(frames[1]["shot_type"], "establishing");
    assert_eq!(report["scenes"][0]["composite_groups"][0]["grid_format"], "2x2");
}

/// Reading a missing batch file reports the path.
#[tokio::test]
async fn missing_batch_file_is_io_error() {
    let dir = tempfile::tempdir().expect("create dir");
    let path = dir.path().join("absent.json");
    let err = read_batch(&path).await.unwrap_err();
    assert_matches!(&err, WorkerError::Io { .. });
    assert!(err.to_string().contains("absent.json"));
}

/// Malformed JSON is a JSON error, not a panic.
#[tokio::test]
async fn malformed_batch_file_is_json_error() {
    let mut input = tempfile::NamedTempFile::new().expect("create input file");
    write!(input, "{{\"scenes\": [{{\"scene_id\": 1}}]}}").expect("write input file");
    assert_matches!(read_batch(input.path()).await, Err(WorkerError::Json(_)));
}

/// The rendered report lists every scene and sums the totals.
#[tokio::test]
async fn report_totals_sum_scenes() {
    let outputs = run_batch(vec![wide_scene("a", 9), wide_scene("b", 3)], &config("2"))
        .await
        .unwrap();
    let report: serde_json::Value =
        serde_json::from_str(&render_report(&outputs).unwrap()).expect("report is json");

    assert_eq!(report["totals"]["frames"], 12);
    assert_eq!(report["totals"]["generation_calls"], 4);
    assert_eq!(report["scenes"][1]["recommendations"][0]["kind"], "mostly_individual");
}
