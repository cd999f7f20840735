//! Time-based activity classification
//!
//! A vehicle is active iff its latest sample is younger than the activity
//! window. The classification is a pure function of the stored timestamp and
//! `now`, so it is recomputed on every read: a silent vehicle goes stale with
//! no merge event at all.

use crate::model::{TelemetrySample, VehicleState, VehicleStatus};
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StalenessClassifier {
    window: TimeDelta,
}

impl StalenessClassifier {
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    pub fn classify(&self, state: &VehicleState, now: DateTime<Utc>) -> VehicleStatus {
        self.classify_sample(&state.latest_sample, now)
    }

    /// Samples dated in the future (source clock ahead of ours) count as fresh.
    pub fn classify_sample(&self, sample: &TelemetrySample, now: DateTime<Utc>) -> VehicleStatus {
        if now.signed_duration_since(sample.timestamp) < self.window {
            VehicleStatus::Active
        } else {
            VehicleStatus::Inactive
        }
    }

    /// Copy of `state` with its status re-derived at `now`
    pub fn reclassify(&self, state: &VehicleState, now: DateTime<Utc>) -> VehicleState {
        VehicleState {
            derived_status: self.classify(state, now),
            ..state.clone()
        }
    }
}

impl Default for StalenessClassifier {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(60))
    }
}
