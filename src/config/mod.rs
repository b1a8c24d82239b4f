//! Miner configuration
//!
//! Stored as JSON. Every field has a default, so a partial file (or no file
//! at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config format: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Host driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Share of each step budget actually hashed, in percent (0-100)
    pub intensity: i32,
    /// Iterations requested per `step` call
    pub step_budget: u32,
    /// Pause between steps
    pub step_interval_ms: u64,
    /// How often the hash rate is recomputed and reported
    pub report_interval_secs: u64,
    /// Independent engines to run
    pub threads: usize,
    /// Stop after this many shares (unbounded when absent)
    pub max_shares: Option<usize>,
    /// Worker id used in submitted shares
    pub worker_id: String,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            intensity: 50,
            step_budget: 1000,
            step_interval_ms: 100,
            report_interval_secs: 2,
            threads: 1,
            max_shares: None,
            worker_id: "panthera_worker".to_string(),
        }
    }
}

impl MinerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=100).contains(&self.intensity) {
            return Err(ConfigError::Invalid(format!(
                "intensity must be 0-100, got {}",
                self.intensity
            )));
        }
        if self.step_budget == 0 {
            return Err(ConfigError::Invalid("step_budget must be non-zero".into()));
        }
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be non-zero".into()));
        }
        if self.report_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "report_interval_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Pause between steps, at least one millisecond
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms.max(1))
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}
