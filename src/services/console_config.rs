use std::env;
use std::fs;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const API_URL_ENV: &str = "NOTIFY_METRICS_API_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub experiment_poll_interval_ms: u64,
    pub detail_refresh_interval_ms: u64,
    pub export_page_size: u32,
    pub snapshot_page_size: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            request_timeout_ms: 10_000,
            experiment_poll_interval_ms: 2_000,
            detail_refresh_interval_ms: 5_000,
            export_page_size: 10_000,
            snapshot_page_size: 1_000,
        }
    }
}

impl ConsoleConfig {
    pub fn from_yaml_file(filepath: &str) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(filepath).map_err(|source| ConfigError::Read {
            path: filepath.to_string(),
            source,
        })?;
        Self::from_yaml_str(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: filepath.to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// Loads the optional file, applies the environment override and validates the result.
    pub fn load(filepath: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match filepath {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        if let Ok(url) = env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".to_string()));
        }
        let positive = [
            ("request_timeout_ms", self.request_timeout_ms),
            ("experiment_poll_interval_ms", self.experiment_poll_interval_ms),
            ("detail_refresh_interval_ms", self.detail_refresh_interval_ms),
            ("export_page_size", u64::from(self.export_page_size)),
            ("snapshot_page_size", u64::from(self.snapshot_page_size)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn experiment_poll_interval(&self) -> Duration {
        Duration::from_millis(self.experiment_poll_interval_ms)
    }

    pub fn detail_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.detail_refresh_interval_ms)
    }
}
