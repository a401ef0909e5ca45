//! Configuration loading and typed config structures for the sync engine.
//!
//! The canonical configuration lives in `sinistro-config.yaml` at the
//! project root. Every field has a default, so an empty file (or no file
//! at all, via [`SyncConfig::default`]) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use sinistro_ledger::OverdueThresholds;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// Overdue thresholds that do not escalate.
    #[error("overdue thresholds must satisfy threshold < urgent <= critical (got {attention}/{urgent}/{critical})")]
    Thresholds {
        /// `ledger.overdue_threshold_days`
        attention: u32,
        /// `ledger.urgent_days`
        urgent: u32,
        /// `ledger.critical_days`
        critical: u32,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `sinistro-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Local store settings.
    #[serde(default)]
    pub local: LocalConfig,

    /// Remote store settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Ledger rules.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SyncConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `SINISTRO_DATA_DIR` overrides `local.data_dir`
    /// - `DRAGONFLY_URL` overrides `remote.dragonfly_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Thresholds`] if the overdue tiers are out of order.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Thresholds`] if the overdue tiers are out of order.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.ledger.thresholds()?;
        Ok(config)
    }

    /// Override paths and URLs with environment variables when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("SINISTRO_DATA_DIR") {
            self.local.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.remote.dragonfly_url = val;
        }
    }
}

/// Local store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalConfig {
    /// Directory holding one JSON file per key.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Remote store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,

    /// Namespace month records are stored under.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Deadline for a single remote call, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl RemoteConfig {
    /// [`Self::timeout_ms`] as a [`Duration`].
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            dragonfly_url: default_dragonfly_url(),
            namespace: default_namespace(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Ledger rule configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LedgerConfig {
    /// Days at the workshop after which an open incident is overdue.
    #[serde(default = "default_overdue_threshold_days")]
    pub overdue_threshold_days: u32,

    /// Days at which an overdue incident becomes urgent.
    #[serde(default = "default_urgent_days")]
    pub urgent_days: u32,

    /// Days at which an overdue incident becomes critical.
    #[serde(default = "default_critical_days")]
    pub critical_days: u32,
}

impl LedgerConfig {
    /// The overdue tiers, validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Thresholds`] unless
    /// `overdue_threshold_days < urgent_days <= critical_days`.
    pub const fn thresholds(&self) -> Result<OverdueThresholds, ConfigError> {
        if self.overdue_threshold_days >= self.urgent_days || self.urgent_days > self.critical_days
        {
            return Err(ConfigError::Thresholds {
                attention: self.overdue_threshold_days,
                urgent: self.urgent_days,
                critical: self.critical_days,
            });
        }
        Ok(OverdueThresholds {
            attention_days: self.overdue_threshold_days,
            urgent_days: self.urgent_days,
            critical_days: self.critical_days,
        })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            overdue_threshold_days: default_overdue_threshold_days(),
            urgent_days: default_urgent_days(),
            critical_days: default_critical_days(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_namespace() -> String {
    sinistro_store::DEFAULT_NAMESPACE.to_owned()
}

const fn default_timeout_ms() -> u64 {
    5000
}

const fn default_overdue_threshold_days() -> u32 {
    40
}

const fn default_urgent_days() -> u32 {
    60
}

const fn default_critical_days() -> u32 {
    90
}

fn default_log_level() -> String {
    "info".to_owned()
}
