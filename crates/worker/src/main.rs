//! `framegen-worker` -- batch scene planner.
//!
//! Reads a batch of storyboard scenes, decides the generation strategy of
//! every frame, and writes the annotated plans as JSON. Logs go to stderr
//! so the report can be piped from stdout.
//!
//! # Environment variables
//!
//! | Variable                | Required | Default               | Description                        |
//! |-------------------------|----------|-----------------------|------------------------------------|
//! | `FRAMEGEN_INPUT`        | yes      | --                    | Batch file (`{"scenes": [...]}`)   |
//! | `FRAMEGEN_OUTPUT`       | no       | stdout                | Report file                        |
//! | `FRAMEGEN_WORKERS`      | no       | available parallelism | Scenes planned concurrently        |
//! | `FRAMEGEN_GRID_FORMATS` | no       | `3x3,2x3,2x2`         | Enabled composite grids            |
//! | `LOG_FORMAT`            | no       | `text`                | `text` or `json`                   |

use framegen_worker::{batch, LogFormat, WorkerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;
    init_tracing(config.log_format);

    let formats: Vec<&str> = config
        .engine
        .grid_formats()
        .iter()
        .map(|f| f.as_str())
        .collect();
    tracing::info!(
        input = %config.input.display(),
        workers = config.workers,
        grid_formats = %formats.join(","),
        "Starting framegen-worker",
    );

    let scenes = batch::read_batch(&config.input).await?;
    let outputs = batch::run_batch(scenes, &config).await?;
    batch::write_report(&outputs, config.output.as_deref()).await?;

    let totals = batch::BatchTotals::of(&outputs);
    tracing::info!(
        scenes = totals.scenes,
        frames = totals.frames,
        generation_calls = totals.generation_calls,
        "Batch complete",
    );
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "framegen_worker=info,framegen_core=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
