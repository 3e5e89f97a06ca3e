use std::path::PathBuf;

use python_runner::RunnerError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LabError>;

#[derive(Debug, Error)]
pub enum LabError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("Simulation finished but did not produce {path}: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not clear previous output {path}: {source}")]
    StaleOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Simulation output is not valid JSON: {0}")]
    MalformedOutput(#[from] serde_json::Error),

    #[error("Failed to write cache file {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lab run aborted: {0}")]
    RunAborted(String),
}
