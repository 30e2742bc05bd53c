//! Runtime settings for concurrent wiring models.
//!
//! ```toml
//! worker_threads = 4
//! health_monitor_period_ms = 100
//! health_log_interval_ms = 10000
//! keep_alive = true
//! default_health_threshold = 1000
//! ```
//!
//! Every key is optional; missing keys take the [`ConcurrentSettings`] defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solder_core::ConcurrentSettings;

use crate::error::ConfigError;
use crate::file::{read_toml, write_toml};

/// Serialized form of [`ConcurrentSettings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WiringConfig {
    /// Shared pool size. 0 uses the available parallelism.
    pub worker_threads: usize,
    /// Health monitor heartbeat period in milliseconds.
    pub health_monitor_period_ms: u64,
    /// Minimum time between health log lines for one scheduler, in milliseconds.
    pub health_log_interval_ms: u64,
    /// Start a keep-alive thread with the model.
    pub keep_alive: bool,
    /// Health threshold for schedulers that set neither a threshold nor a capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_health_threshold: Option<usize>,
}

impl Default for WiringConfig {
    fn default() -> Self {
        Self::from(&ConcurrentSettings::default())
    }
}

impl WiringConfig {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_toml(path.as_ref())
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Save settings to a TOML file, creating the parent directory if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        write_toml(self, path.as_ref())
    }

    /// Serialize settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Converts into the settings the concurrent runtime consumes.
    pub fn to_settings(&self) -> ConcurrentSettings {
        ConcurrentSettings {
            worker_threads: self.worker_threads,
            health_monitor_period: Duration::from_millis(self.health_monitor_period_ms),
            health_log_interval: Duration::from_millis(self.health_log_interval_ms),
            keep_alive: self.keep_alive,
            default_health_threshold: self.default_health_threshold,
        }
    }
}

impl From<&ConcurrentSettings> for WiringConfig {
    fn from(settings: &ConcurrentSettings) -> Self {
        Self {
            worker_threads: settings.worker_threads,
            health_monitor_period_ms: settings.health_monitor_period.as_millis() as u64,
            health_log_interval_ms: settings.health_log_interval.as_millis() as u64,
            keep_alive: settings.keep_alive,
            default_health_threshold: settings.default_health_threshold,
        }
    }
}

impl From<&WiringConfig> for ConcurrentSettings {
    fn from(config: &WiringConfig) -> Self {
        config.to_settings()
    }
}
