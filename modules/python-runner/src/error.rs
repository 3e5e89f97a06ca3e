use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("No usable Python interpreter found (tried: {})", candidates.join(", "))]
    InterpreterNotFound { candidates: Vec<String> },

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(*code))]
    Exit {
        program: String,
        code: Option<i32>,
        /// Leading excerpt of stderr only; the full stream is not retained.
        stderr: String,
    },

    #[error("{program} timed out after {}ms and was killed", after.as_millis())]
    Timeout { program: String, after: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
