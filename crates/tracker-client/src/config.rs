//! Tracker configuration.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Default identity resolution timeout.
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default days between kit exchanges when a profile has no plan cadence.
const DEFAULT_CADENCE_DAYS: u32 = 15;

/// Configuration for a [`Tracker`](crate::Tracker) instance.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long identity resolution may wait for a sign-in event.
    pub auth_timeout: Duration,
    /// Fallback plan cadence in days.
    pub default_cadence_days: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            default_cadence_days: DEFAULT_CADENCE_DAYS,
        }
    }
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_default_cadence_days(mut self, days: u32) -> Self {
        self.default_cadence_days = days;
        self
    }

    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Reads `KITTRACK_AUTH_TIMEOUT_SECS` and `KITTRACK_DEFAULT_CADENCE_DAYS`.
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var("KITTRACK_AUTH_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => config.auth_timeout = Duration::from_secs(secs),
                Err(_) => warn!(value = %raw, "ignoring invalid KITTRACK_AUTH_TIMEOUT_SECS"),
            }
        }

        if let Ok(raw) = env::var("KITTRACK_DEFAULT_CADENCE_DAYS") {
            match raw.parse::<u32>() {
                Ok(days) if days > 0 => config.default_cadence_days = days,
                _ => warn!(value = %raw, "ignoring invalid KITTRACK_DEFAULT_CADENCE_DAYS"),
            }
        }

        config
    }
}
