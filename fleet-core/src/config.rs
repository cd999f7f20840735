//! Engine configuration
//!
//! Every knob has a serde default, so an empty `[engine]` table (or none at
//! all) yields the documented defaults. The camelCase names used by the
//! producer system are accepted as aliases.

use crate::error::ConfigError;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum sample age for a vehicle to count as active
    #[serde(default = "default_activity_window", alias = "activityWindowSeconds")]
    pub activity_window_secs: u64,

    /// Period of the fetch → merge → publish cycle
    #[serde(default = "default_poll_interval", alias = "pollIntervalSeconds")]
    pub poll_interval_secs: u64,

    /// A fetch still pending after this long counts as failed
    #[serde(default = "default_fetch_timeout", alias = "fetchTimeoutSeconds")]
    pub fetch_timeout_secs: u64,

    /// `engineTemp` strictly above this raises HighEngineTemp (°C)
    #[serde(
        default = "default_engine_temp_threshold",
        alias = "engineTempAlertThreshold"
    )]
    pub engine_temp_alert_threshold: f64,

    /// `fuel` strictly below this raises LowFuel (%)
    #[serde(default = "default_fuel_threshold", alias = "fuelAlertThreshold")]
    pub fuel_alert_threshold: f64,
}

fn default_activity_window() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    10
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_engine_temp_threshold() -> f64 {
    90.0
}

fn default_fuel_threshold() -> f64 {
    20.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            activity_window_secs: default_activity_window(),
            poll_interval_secs: default_poll_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            engine_temp_alert_threshold: default_engine_temp_threshold(),
            fuel_alert_threshold: default_fuel_threshold(),
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secs) in [
            ("activity_window_secs", self.activity_window_secs),
            ("poll_interval_secs", self.poll_interval_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ZeroDuration { name });
            }
        }

        for (name, value) in [
            ("engine_temp_alert_threshold", self.engine_temp_alert_threshold),
            ("fuel_alert_threshold", self.fuel_alert_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }

        Ok(())
    }

    pub fn activity_window(&self) -> TimeDelta {
        i64::try_from(self.activity_window_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
