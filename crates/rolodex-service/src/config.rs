//! Service configuration
//!
//! Every key is optional; missing keys take their defaults and unknown keys
//! are rejected.
//!
//! ```toml
//! notify_debounce_ms = 250
//! primary_store = "local"
//!
//! [log]
//! filter = "rolodex_sync=debug,info"
//! json = true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Contact service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Quiet period before pending change notifications are emitted
    pub notify_debounce_ms: u64,
    /// Capacity of the change notification channel
    pub notify_capacity: usize,
    /// Store new records are created in; the aggregator's primary if unset
    pub primary_store: Option<String>,
    /// Logging
    pub log: LogConfig,
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// - `ConfigError::Parse` on invalid TOML or unknown keys
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - `ConfigError::Parse` on invalid contents
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With debounce period
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, period: Duration) -> Self {
        self.notify_debounce_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With primary store override
    #[inline]
    #[must_use]
    pub fn with_primary_store(mut self, store: impl Into<String>) -> Self {
        self.primary_store = Some(store.into());
        self
    }

    /// With logging settings
    #[inline]
    #[must_use]
    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    /// Debounce period
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.notify_debounce_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            notify_debounce_ms: 500,
            notify_capacity: 64,
            primary_store: None,
            log: LogConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}
