//! Service configuration
//!
//! Resolution order: built-in defaults, then the TOML file (if any), then
//! `KINDRED_*` environment variables.

use kindred_common::UNLIMITED_INTERACTIONS;
use kindred_ledger::LedgerSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("invalid value for {key}: {value}")]
    Env {
        /// Variable name
        key: &'static str,
        /// Raw value
        value: String,
    },

    /// Values parse but make no sense together
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindredConfig {
    /// Interactions per actor per UTC day
    pub daily_limit: u32,
    /// Catalog name of the capability that lifts the limit
    pub unlimited_capability: String,
    /// Profiles returned by `get_profiles`
    pub candidate_batch: usize,
    /// Deadline for every façade call
    pub request_timeout_ms: u64,
    /// Session tokens
    pub session: SessionConfig,
    /// Persistence backend
    pub store: StoreConfig,
}

impl Default for KindredConfig {
    fn default() -> Self {
        Self {
            daily_limit: 10,
            unlimited_capability: UNLIMITED_INTERACTIONS.to_string(),
            candidate_batch: 1,
            request_timeout_ms: 5000,
            session: SessionConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// HS256 signing secret
    pub secret: String,
    /// Token lifetime
    pub ttl_hours: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: "kindred-dev-secret-change-in-production".to_string(),
            ttl_hours: 24,
        }
    }
}

/// Persistence backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local tables
    #[default]
    Memory,
    /// SQLite database
    Sqlite {
        /// Connection URL
        url: String,
        /// Pool size
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Lock wait before a write fails
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl KindredConfig {
    /// Load from `path` (when given and present) and apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                Self::from_toml(&content)?
            }
            _ => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `KINDRED_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("KINDRED_DAILY_LIMIT") {
            self.daily_limit = parse_env("KINDRED_DAILY_LIMIT", v)?;
        }
        if let Some(v) = lookup("KINDRED_UNLIMITED_CAPABILITY") {
            self.unlimited_capability = v;
        }
        if let Some(v) = lookup("KINDRED_CANDIDATE_BATCH") {
            self.candidate_batch = parse_env("KINDRED_CANDIDATE_BATCH", v)?;
        }
        if let Some(v) = lookup("KINDRED_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse_env("KINDRED_REQUEST_TIMEOUT_MS", v)?;
        }
        if let Some(v) = lookup("KINDRED_JWT_SECRET") {
            self.session.secret = v;
        }
        if let Some(v) = lookup("KINDRED_SESSION_TTL_HOURS") {
            self.session.ttl_hours = parse_env("KINDRED_SESSION_TTL_HOURS", v)?;
        }
        if let Some(url) = lookup("KINDRED_DATABASE_URL") {
            self.store = match std::mem::take(&mut self.store) {
                StoreConfig::Sqlite {
                    max_connections,
                    busy_timeout_ms,
                    ..
                } => StoreConfig::Sqlite {
                    url,
                    max_connections,
                    busy_timeout_ms,
                },
                StoreConfig::Memory => StoreConfig::Sqlite {
                    url,
                    max_connections: default_max_connections(),
                    busy_timeout_ms: default_busy_timeout_ms(),
                },
            };
        }
        Ok(())
    }

    /// Reject combinations the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidate_batch == 0 {
            return Err(ConfigError::Invalid("candidate_batch must be at least 1".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("request_timeout_ms must be positive".into()));
        }
        if self.session.secret.is_empty() {
            return Err(ConfigError::Invalid("session.secret is empty".into()));
        }
        if self.session.ttl_hours <= 0 {
            return Err(ConfigError::Invalid("session.ttl_hours must be positive".into()));
        }
        if self.unlimited_capability.trim().is_empty() {
            return Err(ConfigError::Invalid("unlimited_capability is empty".into()));
        }
        Ok(())
    }

    /// Ledger view of this configuration
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            daily_limit: self.daily_limit,
            unlimited_capability: self.unlimited_capability.clone(),
            candidate_batch: self.candidate_batch,
        }
    }

    /// Deadline for façade calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env { key, value })
}
