//! Service configuration loading
//!
//! Settings come from a TOML file with per-field overrides applied on top
//! (command line > environment > config file > compiled default). A missing
//! config file falls back to defaults with a warning and never prevents
//! startup; an unreadable or invalid file is a hard error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// MQTT broker connection parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// Broker hostname
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Optional username for authenticated brokers
    pub username: Option<String>,
    /// Optional password for authenticated brokers
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
        }
    }
}

/// G2P engine invocation parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// G2P engine binary, resolved via PATH when not absolute
    pub binary: PathBuf,
    /// Trained G2P model file; guessing is disabled without one
    pub model: Option<PathBuf>,
    /// Cap on simultaneous engine invocations
    pub max_concurrent_calls: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("phonetisaurus-apply"),
            model: None,
            max_concurrent_calls: 4,
        }
    }
}

/// Request handling parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Accepted site ids; empty means all sites
    pub site_ids: Vec<String>,
    /// Pronunciation dictionary files, consulted before the engine
    pub dictionaries: Vec<PathBuf>,
    /// Per-word engine call timeout in milliseconds
    pub per_word_timeout_ms: u64,
    /// Whole-request ceiling in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            site_ids: Vec::new(),
            dictionaries: Vec::new(),
            per_word_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub backend: BackendConfig,
    pub service: ServiceConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// `path = None` means no file was specified: compiled defaults apply.
    /// A specified-but-missing file logs a warning and also falls back to
    /// defaults, so a bad deployment still starts and reports errors per
    /// request rather than dying silently.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Check invariants that would otherwise surface as runtime stalls.
    pub fn validate(&self) -> Result<()> {
        if self.backend.max_concurrent_calls == 0 {
            return Err(Error::Config(
                "backend.max_concurrent_calls must be at least 1".to_string(),
            ));
        }
        if self.service.per_word_timeout_ms == 0 {
            return Err(Error::Config(
                "service.per_word_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.service.request_timeout_ms < self.service.per_word_timeout_ms {
            return Err(Error::Config(
                "service.request_timeout_ms must be >= per_word_timeout_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-word engine call timeout.
    pub fn per_word_timeout(&self) -> Duration {
        Duration::from_millis(self.service.per_word_timeout_ms)
    }

    /// Whole-request ceiling.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.service.request_timeout_ms)
    }
}
