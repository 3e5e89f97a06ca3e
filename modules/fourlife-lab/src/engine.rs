use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use python_runner::{InterpreterLocator, ProcessRunner, ProcessSpec};
use tracing::info;

use crate::cache::validate_json;
use crate::descriptor::{ArtifactDescriptor, OutputMode};
use crate::error::{LabError, Result};

/// Produces a fresh artifact for a descriptor.
#[async_trait]
pub trait SimulationEngine: Send + Sync {
    async fn run(&self, descriptor: &ArtifactDescriptor, timeout: Duration) -> Result<Bytes>;
}

/// Runs the external Web4 simulation scripts with a located Python interpreter.
pub struct PythonEngine {
    engine_dir: PathBuf,
    locator: Arc<InterpreterLocator>,
    runner: ProcessRunner,
}

impl PythonEngine {
    pub fn new(engine_dir: impl Into<PathBuf>, locator: Arc<InterpreterLocator>, runner: ProcessRunner) -> Self {
        Self {
            engine_dir: engine_dir.into(),
            locator,
            runner,
        }
    }

    pub fn engine_dir(&self) -> &Path {
        &self.engine_dir
    }
}

#[async_trait]
impl SimulationEngine for PythonEngine {
    async fn run(&self, descriptor: &ArtifactDescriptor, timeout: Duration) -> Result<Bytes> {
        let interpreter = self.locator.resolve().await?;

        // A leftover file from an earlier run must not pass for this run's output.
        if let OutputMode::File(name) = descriptor.output {
            match tokio::fs::remove_file(self.engine_dir.join(name)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(LabError::StaleOutput {
                        path: self.engine_dir.join(name),
                        source,
                    })
                }
            }
        }

        let spec = ProcessSpec::new(interpreter, &self.engine_dir, timeout)
            .arg(descriptor.script)
            .args(descriptor.args.iter().cloned());

        info!(
            kind = %descriptor.kind,
            interpreter,
            command = %descriptor,
            timeout_ms = timeout.as_millis() as u64,
            "Running simulation"
        );

        let output = self.runner.run(&spec).await?;

        let bytes = match descriptor.output {
            OutputMode::Stdout => output.stdout.into_bytes(),
            OutputMode::File(name) => {
                let path = self.engine_dir.join(name);
                tokio::fs::read(&path)
                    .await
                    .map_err(|source| LabError::MissingOutput { path, source })?
            }
        };

        validate_json(&bytes)?;
        Ok(Bytes::from(bytes))
    }
}
