use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{DriftError, Result};

pub mod env {
    pub const OLLAMA_HOST: &str = "OLLAMA_HOST";
    pub const MODEL: &str = "LLMDRIFT_MODEL";
    pub const POLL_INTERVAL_MS: &str = "LLMDRIFT_POLL_INTERVAL_MS";
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub reporter: ReporterConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl DriftConfig {
    /// Read a JSON config file. Missing sections fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| DriftError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Override fields from the process environment.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Ok(host) = std::env::var(env::OLLAMA_HOST) {
            self.oracle.host = host;
        }
        if let Ok(model) = std::env::var(env::MODEL) {
            self.oracle.model = model;
        }
        if let Ok(raw) = std::env::var(env::POLL_INTERVAL_MS) {
            self.reporter.interval_ms = raw.parse().map_err(|_| {
                DriftError::Config(format!("{} must be an integer, got {:?}", env::POLL_INTERVAL_MS, raw))
            })?;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub host: String,
    pub model: String,
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            temperature: 0.0,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    pub interval_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 100,
        }
    }
}
