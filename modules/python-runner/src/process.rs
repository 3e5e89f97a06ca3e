use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::{Result, RunnerError};

/// Default number of stderr characters kept on a failed run.
pub const DEFAULT_STDERR_EXCERPT_CHARS: usize = 2000;

/// One external invocation: program, arguments, working directory, deadline.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            timeout,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Captured result of a process that exited with status zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Spawns child processes with piped output and a hard deadline.
///
/// The child inherits this process's environment unchanged. No sandboxing
/// or scrubbing happens here; whatever the server can see, the script can see.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    stderr_excerpt_chars: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_STDERR_EXCERPT_CHARS)
    }
}

impl ProcessRunner {
    pub fn new(stderr_excerpt_chars: usize) -> Self {
        Self {
            stderr_excerpt_chars,
        }
    }

    /// Run to completion. Non-zero exit, spawn failure and timeout are all errors.
    /// On timeout the child is killed and reaped before returning.
    pub async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        let start = Instant::now();

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: spec.program.clone(),
                source,
            })?;

        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();

        let collect = async {
            let mut stdout = Vec::new();
            let mut stderr = Vec::new();
            let (out_res, err_res, status) = tokio::join!(
                read_pipe(stdout_pipe.as_mut(), &mut stdout),
                read_pipe(stderr_pipe.as_mut(), &mut stderr),
                child.wait(),
            );
            out_res?;
            err_res?;
            Ok::<_, std::io::Error>((status?, stdout, stderr))
        };

        let outcome = tokio::time::timeout(spec.timeout, collect).await;
        let (status, stdout, stderr) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(source)) => {
                return Err(RunnerError::Io {
                    program: spec.program.clone(),
                    source,
                })
            }
            Err(_) => {
                // The process may have exited between the deadline and here; kill then tolerates it.
                if let Err(e) = child.kill().await {
                    warn!(program = spec.program.as_str(), error = %e, "Failed to kill timed-out process");
                }
                warn!(
                    program = spec.program.as_str(),
                    timeout_ms = spec.timeout.as_millis() as u64,
                    "Process timed out"
                );
                return Err(RunnerError::Timeout {
                    program: spec.program.clone(),
                    after: spec.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            warn!(
                program = spec.program.as_str(),
                code = ?status.code(),
                elapsed_ms,
                "Process exited with error"
            );
            return Err(RunnerError::Exit {
                program: spec.program.clone(),
                code: status.code(),
                stderr: excerpt(&stderr, self.stderr_excerpt_chars),
            });
        }

        info!(
            program = spec.program.as_str(),
            elapsed_ms,
            stdout_bytes = stdout.len(),
            "Process finished"
        );

        Ok(ProcessOutput {
            stdout,
            stderr,
            code: status.code().unwrap_or(0),
        })
    }
}

async fn read_pipe<R>(pipe: Option<&mut R>, buf: &mut Vec<u8>) -> std::io::Result<()>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match pipe {
        Some(p) => p.read_to_end(buf).await.map(|_| ()),
        None => Ok(()),
    }
}

/// First `max_chars` characters of `text`, on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
