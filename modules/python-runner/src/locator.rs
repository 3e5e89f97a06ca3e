use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{Result, RunnerError};

/// Probes get this long to answer `--version` before the candidate is skipped.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_CANDIDATES: &[&str] = &["python3", "python"];

/// Finds the first working interpreter among ordered candidates and remembers it.
///
/// The answer is computed at most once per locator; concurrent first callers
/// wait on the same probe. Share one locator (behind an `Arc`) per server.
#[derive(Debug)]
pub struct InterpreterLocator {
    candidates: Vec<String>,
    resolved: OnceCell<String>,
}

impl Default for InterpreterLocator {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATES.iter().map(|c| c.to_string()).collect())
    }
}

impl InterpreterLocator {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            resolved: OnceCell::new(),
        }
    }

    /// A locator that skips probing and always answers `program`.
    pub fn fixed(program: impl Into<String>) -> Self {
        let program = program.into();
        Self {
            candidates: vec![program.clone()],
            resolved: OnceCell::new_with(Some(program)),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub async fn resolve(&self) -> Result<&str> {
        self.resolved
            .get_or_try_init(|| probe_candidates(&self.candidates))
            .await
            .map(String::as_str)
    }
}

async fn probe_candidates(candidates: &[String]) -> Result<String> {
    for candidate in candidates {
        if probe(candidate).await {
            info!(interpreter = candidate.as_str(), "Resolved Python interpreter");
            return Ok(candidate.clone());
        }
        debug!(candidate = candidate.as_str(), "Interpreter candidate unavailable");
    }
    Err(RunnerError::InterpreterNotFound {
        candidates: candidates.to_vec(),
    })
}

async fn probe(candidate: &str) -> bool {
    let status = Command::new(candidate)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, status).await,
        Ok(Ok(s)) if s.success()
    )
}
