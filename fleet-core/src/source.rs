//! Telemetry source trait definition

use crate::error::SourceError;
use crate::model::RawSample;
use crate::normalize::raw_vehicle_id;
use async_trait::async_trait;

/// Trait for external telemetry producers
///
/// Each source is responsible for:
/// - Fetching the full current sample set on demand
/// - Returning raw, unvalidated samples (the engine normalizes them)
///
/// Sources are polled by a single scheduler task; they never write to the
/// engine themselves.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Name of this source for logs and status (e.g., "http", "demo")
    fn name(&self) -> &str;

    /// Fetch the current sample for every vehicle the producer knows about
    ///
    /// May suspend on I/O. The caller bounds it with a timeout, so
    /// implementations don't need to enforce one themselves.
    async fn fetch_all(&self) -> Result<Vec<RawSample>, SourceError>;

    /// Fetch a single vehicle's sample
    ///
    /// Returns `Ok(None)` when the producer doesn't know the vehicle. The
    /// default filters a bulk fetch; sources with a cheaper per-vehicle
    /// endpoint should override it.
    async fn fetch_vehicle(&self, vehicle_id: &str) -> Result<Option<RawSample>, SourceError> {
        let samples = self.fetch_all().await?;
        Ok(samples
            .into_iter()
            .find(|raw| raw_vehicle_id(raw).as_deref() == Some(vehicle_id)))
    }
}
