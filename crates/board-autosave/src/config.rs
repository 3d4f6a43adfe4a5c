//! Autosave configuration
//!
//! Loaded from TOML. Every key is optional:
//!
//! ```toml
//! save_interval_ms = 20000
//! staleness_threshold_ms = 30000
//! pointer_throttle_ms = 1000
//! ```

use crate::error::ConfigError;
use board_activity::{MonitorConfig, POINTER_THROTTLE_WINDOW, STALENESS_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default delay between ticks
pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_millis(20_000);

/// Autosave configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutosaveConfig {
    /// Delay between ticks in milliseconds
    pub save_interval_ms: u64,
    /// Activity older than this is stale, in milliseconds
    pub staleness_threshold_ms: u64,
    /// Pointer-move coalescing window in milliseconds
    pub pointer_throttle_ms: u64,
}

impl AutosaveConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With save interval
    #[inline]
    #[must_use]
    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval_ms = duration_ms(interval);
        self
    }

    /// With staleness threshold
    #[inline]
    #[must_use]
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold_ms = duration_ms(threshold);
        self
    }

    /// With pointer throttle window
    #[inline]
    #[must_use]
    pub fn with_pointer_throttle(mut self, window: Duration) -> Self {
        self.pointer_throttle_ms = duration_ms(window);
        self
    }

    /// Delay between ticks
    #[inline]
    #[must_use]
    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }

    /// Settings for the activity monitor
    #[must_use]
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig::new()
            .with_staleness_threshold(Duration::from_millis(self.staleness_threshold_ms))
            .with_pointer_throttle(Duration::from_millis(self.pointer_throttle_ms))
    }

    /// Reject zero durations
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("save_interval_ms", self.save_interval_ms),
            ("staleness_threshold_ms", self.staleness_threshold_ms),
            ("pointer_throttle_ms", self.pointer_throttle_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be greater than 0")));
            }
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown keys
    /// - `ConfigError::Invalid` if validation fails
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - see [`from_toml_str`](Self::from_toml_str)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML
    ///
    /// # Errors
    /// - `ConfigError::Invalid` if serialization fails
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            save_interval_ms: duration_ms(DEFAULT_SAVE_INTERVAL),
            staleness_threshold_ms: duration_ms(STALENESS_THRESHOLD),
            pointer_throttle_ms: duration_ms(POINTER_THROTTLE_WINDOW),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
