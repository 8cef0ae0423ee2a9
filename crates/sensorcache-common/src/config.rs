//! Configuration types for the content cache
//!
//! These structures are deserialized from the admin binary's TOML file; every
//! field has a serde default so partial files are accepted.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for the fan-out parallelism of the complete update
pub const MAX_THREAD_COUNT: usize = 256;

/// Cache controller configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Period of the background complete update in seconds (0 disables it)
    #[serde(default)]
    pub update_interval_secs: u64,
    /// Number of concurrent per-offering / per-procedure tasks
    #[serde(default = "default_thread_count")]
    pub thread_count: usize,
    /// Locale used when an entity has no localized name
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 0,
            thread_count: default_thread_count(),
            default_locale: default_locale(),
        }
    }
}

impl CacheConfig {
    /// Reject values the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(Error::configuration("thread_count must be at least 1"));
        }
        if self.thread_count > MAX_THREAD_COUNT {
            return Err(Error::configuration(format!(
                "thread_count must not exceed {MAX_THREAD_COUNT}, got {}",
                self.thread_count
            )));
        }
        if self.default_locale.trim().is_empty() {
            return Err(Error::configuration("default_locale must not be empty"));
        }
        Ok(())
    }

    /// Scheduler period, `None` when periodic complete updates are disabled
    #[must_use]
    pub fn update_interval(&self) -> Option<Duration> {
        (self.update_interval_secs > 0).then(|| Duration::from_secs(self.update_interval_secs))
    }
}

fn default_thread_count() -> usize {
    5
}

fn default_locale() -> String {
    "eng".to_string()
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of the human readable format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
