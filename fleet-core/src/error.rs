//! Error types for the fleet engine
//!
//! Malformed samples and out-of-order samples are deliberately absent: the
//! normalizer defaults the former and `merge` discards the latter.

use std::time::Duration;
use thiserror::Error;

/// Failure to obtain samples from an external telemetry source.
///
/// Always recoverable: the scheduler logs it, keeps the last snapshot and
/// tries again on the next interval.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Source could not be reached (connection refused, DNS, reset...)
    #[error("Telemetry source unavailable: {0}")]
    Unavailable(String),

    /// Fetch did not complete within the configured timeout
    #[error("Telemetry fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Source answered with a non-success HTTP status
    #[error("Telemetry source returned HTTP {0}")]
    Status(u16),

    /// Response body was not a sample array / sample object
    #[error("Malformed telemetry payload: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Timeout(_))
    }
}

/// Invalid configuration. Fatal at startup: the engine refuses to run
/// with undefined thresholds or windows.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid threshold {name}: {value} (must be finite and non-negative)")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid duration {name}: must be at least one second")]
    ZeroDuration { name: &'static str },

    #[error("Invalid source configuration: {0}")]
    Source(String),
}
