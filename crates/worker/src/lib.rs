//! `framegen-worker` library crate.
//!
//! Plans batches of storyboard scenes with the strategy engine. The binary
//! entrypoint lives in `main.rs`.

pub mod batch;
pub mod config;
pub mod error;

pub use batch::{read_batch, render_report, run_batch, write_report, SceneInput, SceneOutput};
pub use config::{LogFormat, WorkerConfig};
pub use error::WorkerError;
