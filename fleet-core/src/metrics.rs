//! Fleet-wide metrics
//!
//! Averages only cover vehicles that are active at `now`: a parked truck
//! whose last sample said 45 km/h an hour ago must not skew the live mean.

use crate::model::{FleetMetrics, ReportedState, VehicleState, VehicleStatus};
use crate::staleness::StalenessClassifier;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct FleetMetricsAggregator {
    classifier: StalenessClassifier,
}

impl FleetMetricsAggregator {
    pub fn new(classifier: StalenessClassifier) -> Self {
        Self { classifier }
    }

    /// Pure: the same states and `now` always give the same metrics
    pub fn aggregate(&self, states: &[VehicleState], now: DateTime<Utc>) -> FleetMetrics {
        let total_vehicles = states.len();

        let active: Vec<&VehicleState> = states
            .iter()
            .filter(|s| self.classifier.classify(s, now) == VehicleStatus::Active)
            .collect();
        let active_vehicles = active.len();

        let average_speed = mean(active.iter().map(|s| s.latest_sample.signals.speed.0));
        let average_fuel = mean(active.iter().map(|s| s.latest_sample.signals.fuel.0));

        let fleet_uptime_percent = if total_vehicles == 0 {
            0.0
        } else {
            active_vehicles as f64 / total_vehicles as f64 * 100.0
        };

        let maintenance_count = states
            .iter()
            .filter(|s| s.latest_sample.status.state == ReportedState::Maintenance)
            .count();

        FleetMetrics {
            total_vehicles,
            active_vehicles,
            average_speed,
            average_fuel,
            fleet_uptime_percent,
            maintenance_count,
        }
    }
}

/// Arithmetic mean, 0 for an empty sequence
fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
