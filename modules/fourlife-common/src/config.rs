use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Lab service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // External simulation checkout; scripts run with this as working directory
    pub engine_dir: PathBuf,

    // Artifact cache served to the front end
    pub public_dir: PathBuf,

    // Interpreter probing, in order
    pub python_candidates: Vec<String>,

    // How much stderr a failed run reports back
    pub stderr_excerpt_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web_host: "0.0.0.0".to_string(),
            web_port: 3100,
            engine_dir: PathBuf::from("../web4"),
            public_dir: PathBuf::from("public/lab-runs"),
            python_candidates: vec!["python3".to_string(), "python".to_string()],
            stderr_excerpt_chars: 2000,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys take defaults;
    /// set-but-malformed numbers are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let web_port = match lookup("LAB_PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("LAB_PORT must be a port number, got {v:?}"))?,
            None => defaults.web_port,
        };

        let stderr_excerpt_chars = match lookup("LAB_STDERR_EXCERPT_CHARS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("LAB_STDERR_EXCERPT_CHARS must be a number, got {v:?}"))?,
            None => defaults.stderr_excerpt_chars,
        };

        let python_candidates = lookup("LAB_PYTHON_CANDIDATES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|c| !c.is_empty())
            .unwrap_or(defaults.python_candidates);

        Ok(Self {
            web_host: lookup("LAB_HOST").unwrap_or(defaults.web_host),
            web_port,
            engine_dir: lookup("LAB_ENGINE_DIR").map(PathBuf::from).unwrap_or(defaults.engine_dir),
            public_dir: lookup("LAB_PUBLIC_DIR").map(PathBuf::from).unwrap_or(defaults.public_dir),
            python_candidates,
            stderr_excerpt_chars,
        })
    }

    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  LAB_HOST: {}", self.web_host);
        tracing::info!("  LAB_PORT: {}", self.web_port);
        tracing::info!("  LAB_ENGINE_DIR: {}", self.engine_dir.display());
        tracing::info!("  LAB_PUBLIC_DIR: {}", self.public_dir.display());
        tracing::info!("  LAB_PYTHON_CANDIDATES: {}", self.python_candidates.join(","));
        tracing::info!("  LAB_STDERR_EXCERPT_CHARS: {}", self.stderr_excerpt_chars);
    }
}
