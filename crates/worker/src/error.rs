use std::path::PathBuf;

use framegen_core::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("{0} environment variable is required")]
    MissingEnv(&'static str),

    #[error("Invalid {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },

    #[error("Scene {scene_id}: {source}")]
    Scene {
        scene_id: String,
        #[source]
        source: CoreError,
    },

    #[error("Scene id {0} appears more than once in the batch")]
    DuplicateScene(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Planning task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl WorkerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
