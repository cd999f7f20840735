//! Threshold alerts
//!
//! Evaluated against the latest stored sample whatever the vehicle's
//! activity: a truck that went silent while overheating keeps surfacing
//! that last-known condition. Alerts are regenerated every cycle and never
//! deduplicated.

use crate::config::EngineConfig;
use crate::model::{AlertKind, AlertRecord, VehicleState};

/// Both thresholds are exclusive boundaries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    /// Alert when engine temperature is strictly above (°C)
    pub engine_temp: f64,
    /// Alert when fuel is strictly below (%)
    pub fuel: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            engine_temp: 90.0,
            fuel: 20.0,
        }
    }
}

impl From<&EngineConfig> for AlertThresholds {
    fn from(config: &EngineConfig) -> Self {
        Self {
            engine_temp: config.engine_temp_alert_threshold,
            fuel: config.fuel_alert_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    /// Alerts in vehicle order; within a vehicle HighEngineTemp precedes LowFuel
    pub fn evaluate(&self, states: &[VehicleState]) -> Vec<AlertRecord> {
        let mut alerts = Vec::new();

        for state in states {
            let signals = &state.latest_sample.signals;

            if signals.engine_temp.0 > self.thresholds.engine_temp {
                alerts.push(AlertRecord {
                    vehicle_id: state.vehicle_id.clone(),
                    kind: AlertKind::HighEngineTemp,
                    value: signals.engine_temp.0,
                    threshold: self.thresholds.engine_temp,
                });
            }

            if signals.fuel.0 < self.thresholds.fuel {
                alerts.push(AlertRecord {
                    vehicle_id: state.vehicle_id.clone(),
                    kind: AlertKind::LowFuel,
                    value: signals.fuel.0,
                    threshold: self.thresholds.fuel,
                });
            }
        }

        alerts
    }
}
