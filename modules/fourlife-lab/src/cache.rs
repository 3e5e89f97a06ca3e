use std::io::Write;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use serde::de::IgnoredAny;
use tracing::{debug, info, warn};

use crate::error::{LabError, Result};

/// JSON artifacts on disk, one file per descriptor.
///
/// Readers only ever see complete files: writes go to a temp file in the
/// same directory and are renamed into place.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Cached bytes, verbatim. Missing, unreadable and malformed files are all
    /// reported as a miss.
    pub async fn read(&self, file_name: &str) -> Option<Bytes> {
        let path = self.path(file_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(file = file_name, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(file = file_name, error = %e, "Failed to read cached artifact");
                return None;
            }
        };

        if let Err(e) = validate_json(&bytes) {
            warn!(file = file_name, error = %e, "Cached artifact is not valid JSON, treating as miss");
            return None;
        }

        Some(Bytes::from(bytes))
    }

    pub async fn contains(&self, file_name: &str) -> bool {
        self.read(file_name).await.is_some()
    }

    /// Atomically replace `file_name` with `bytes`. The old file (if any)
    /// survives any failure, including `bytes` not being JSON.
    pub async fn write(&self, file_name: &str, bytes: Bytes) -> Result<PathBuf> {
        validate_json(&bytes)?;

        let dir = self.dir.clone();
        let path = self.path(file_name);
        let target = path.clone();

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)
        .and_then(|r| r);

        match written {
            Ok(()) => {
                info!(file = file_name, path = %path.display(), "Cached artifact written");
                Ok(path)
            }
            Err(source) => Err(LabError::CacheWrite { path, source }),
        }
    }
}

/// Syntax check only; artifacts are passed through whatever their shape.
pub fn validate_json(bytes: &[u8]) -> std::result::Result<(), serde_json::Error> {
    serde_json::from_slice::<IgnoredAny>(bytes).map(|_| ())
}
