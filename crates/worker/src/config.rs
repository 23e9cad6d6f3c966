use std::path::PathBuf;
use std::str::FromStr;

use framegen_core::EngineConfig;

use crate::error::WorkerError;

/// Log output format selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(WorkerError::InvalidEnv {
                var: "LOG_FORMAT",
                reason: format!("unknown format '{other}' (expected text or json)"),
            }),
        }
    }
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Batch file to plan.
    pub input: PathBuf,
    /// Report destination; stdout when `None`.
    pub output: Option<PathBuf>,
    /// Scenes planned concurrently.
    pub workers: usize,
    pub engine: EngineConfig,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `FRAMEGEN_INPUT`        | required                |
    /// | `FRAMEGEN_OUTPUT`       | unset (stdout)          |
    /// | `FRAMEGEN_WORKERS`      | available parallelism   |
    /// | `FRAMEGEN_GRID_FORMATS` | `3x3,2x3,2x2`           |
    /// | `LOG_FORMAT`            | `text`                  |
    pub fn from_env() -> Result<Self, WorkerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorkerError> {
        let input = lookup("FRAMEGEN_INPUT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(WorkerError::MissingEnv("FRAMEGEN_INPUT"))?;

        let output = lookup("FRAMEGEN_OUTPUT")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let workers = match lookup("FRAMEGEN_WORKERS") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(WorkerError::InvalidEnv {
                        var: "FRAMEGEN_WORKERS",
                        reason: format!("'{raw}' is not a positive integer"),
                    })
                }
            },
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        let engine = match lookup("FRAMEGEN_GRID_FORMATS") {
            Some(list) => {
                EngineConfig::parse_grid_formats(&list).map_err(|e| WorkerError::InvalidEnv {
                    var: "FRAMEGEN_GRID_FORMATS",
                    reason: e.to_string(),
                })?
            }
            None => EngineConfig::default(),
        };

        let log_format = lookup("LOG_FORMAT")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            input,
            output,
            workers,
            engine,
            log_format,
        })
    }
}
