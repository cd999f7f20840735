//! Engine facade: store + classifier + aggregator + evaluator
//!
//! The engine is owned by exactly one writer (the polling scheduler). Readers
//! never touch it; they get the immutable `FleetSnapshot` it produces.

use crate::alerts::{AlertEvaluator, AlertThresholds};
use crate::config::EngineConfig;
use crate::metrics::FleetMetricsAggregator;
use crate::model::{FleetSnapshot, RawSample, VehicleState};
use crate::normalize::normalize_batch;
use crate::staleness::StalenessClassifier;
use crate::store::{MergeSummary, VehicleStateStore};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct FleetEngine {
    store: VehicleStateStore,
    classifier: StalenessClassifier,
    aggregator: FleetMetricsAggregator,
    evaluator: AlertEvaluator,
}

impl FleetEngine {
    /// Build an engine from an already-validated config
    pub fn new(config: &EngineConfig) -> Self {
        let classifier = StalenessClassifier::new(config.activity_window());
        Self {
            store: VehicleStateStore::new(classifier),
            classifier,
            aggregator: FleetMetricsAggregator::new(classifier),
            evaluator: AlertEvaluator::new(AlertThresholds::from(config)),
        }
    }

    /// Normalize and merge one fetch result
    pub fn ingest(&mut self, raws: &[RawSample], ingested_at: DateTime<Utc>) -> MergeSummary {
        self.store.merge_all(normalize_batch(raws, ingested_at))
    }

    pub fn store(&self) -> &VehicleStateStore {
        &self.store
    }

    pub fn classifier(&self) -> StalenessClassifier {
        self.classifier
    }

    pub fn vehicle(&self, vehicle_id: &str, now: DateTime<Utc>) -> Option<VehicleState> {
        self.store.get(vehicle_id, now)
    }

    /// Compute a complete snapshot as of `now`
    pub fn snapshot(&self, now: DateTime<Utc>) -> FleetSnapshot {
        let vehicles = self.store.all(now);
        let metrics = self.aggregator.aggregate(&vehicles, now);
        let alerts = self.evaluator.evaluate(&vehicles);

        FleetSnapshot {
            vehicles,
            metrics,
            alerts,
            computed_at: now,
        }
    }
}

impl Default for FleetEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlertKind, AlertRecord, VehicleStatus};
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn raw(id: &str, secs: i64, speed: f64, fuel: f64, engine_temp: f64) -> RawSample {
        json!({
            "vehicleId": id,
            "timestamp": secs * 1000,
            "signals": {"speed": speed, "fuel": fuel, "engineTemp": engine_temp}
        })
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut engine = FleetEngine::default();
        let summary = engine.ingest(
            &[
                raw("V1", 100, 50.0, 15.0, 95.0),
                raw("V2", 100, 30.0, 80.0, 70.0),
            ],
            at(105),
        );
        assert_eq!(summary.inserted, 2);

        let snapshot = engine.snapshot(at(105));

        assert!(snapshot
            .vehicles
            .iter()
            .all(|v| v.derived_status == VehicleStatus::Active));
        assert_eq!(snapshot.metrics.total_vehicles, 2);
        assert_eq!(snapshot.metrics.active_vehicles, 2);
        assert_eq!(snapshot.metrics.average_speed, 40.0);
        assert_eq!(snapshot.metrics.average_fuel, 47.5);
        assert_eq!(snapshot.metrics.fleet_uptime_percent, 100.0);
        assert_eq!(
            snapshot.alerts,
            vec![
                AlertRecord {
                    vehicle_id: "V1".to_string(),
                    kind: AlertKind::HighEngineTemp,
                    value: 95.0,
                    threshold: 90.0,
                },
                AlertRecord {
                    vehicle_id: "V1".to_string(),
                    kind: AlertKind::LowFuel,
                    value: 15.0,
                    threshold: 20.0,
                },
            ]
        );
        assert_eq!(snapshot.computed_at, at(105));
    }

    #[test]
    fn test_snapshot_reflects_time_passing() {
        let mut engine = FleetEngine::default();
        engine.ingest(&[raw("V1", 100, 50.0, 50.0, 70.0)], at(100));

        assert_eq!(engine.snapshot(at(150)).metrics.active_vehicles, 1);
        let later = engine.snapshot(at(200));
        assert_eq!(later.metrics.active_vehicles, 0);
        assert_eq!(later.metrics.total_vehicles, 1);
        assert_eq!(
            engine.vehicle("V1", at(200)).map(|v| v.derived_status),
            Some(VehicleStatus::Inactive)
        );
    }

    #[test]
    fn test_custom_window() {
        let config = EngineConfig {
            activity_window_secs: 10,
            ..Default::default()
        };
        let mut engine = FleetEngine::new(&config);
        engine.ingest(&[raw("V1", 100, 50.0, 50.0, 70.0)], at(100));

        assert_eq!(engine.snapshot(at(109)).metrics.active_vehicles, 1);
        assert_eq!(engine.snapshot(at(111)).metrics.active_vehicles, 0);
    }

    #[test]
    fn test_out_of_order_batch_keeps_newest() {
        let mut engine = FleetEngine::default();
        let summary = engine.ingest(
            &[raw("V1", 200, 80.0, 50.0, 70.0), raw("V1", 150, 10.0, 50.0, 70.0)],
            at(201),
        );
        assert_eq!(summary.stale, 1);
        assert_eq!(engine.snapshot(at(201)).metrics.average_speed, 80.0);
    }
}
