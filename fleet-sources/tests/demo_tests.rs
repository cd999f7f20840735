//! Integration tests for the DemoSource

use chrono::{TimeZone, Utc};
use fleet_core::normalize::normalize;
use fleet_core::{FleetEngine, TelemetrySource};
use fleet_sources::demo::LegKind;
use fleet_sources::DemoSource;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn test_demo_source_name() {
    let source = DemoSource::new(4);
    assert_eq!(source.name(), "demo");
}

#[test]
fn test_vehicle_ids() {
    assert_eq!(DemoSource::vehicle_id(0), "TRUCK-001");
    assert_eq!(DemoSource::vehicle_id(41), "TRUCK-042");
}

#[test]
fn test_output_is_deterministic() {
    let source = DemoSource::new(8);
    assert_eq!(
        source.samples_at(123.4, now()),
        source.samples_at(123.4, now())
    );
}

#[test]
fn test_reporting_matches_schedule() {
    let source = DemoSource::new(8);

    for step in 0..200 {
        let elapsed = step as f64 * 3.7;
        let ids: Vec<String> = source
            .samples_at(elapsed, now())
            .iter()
            .map(|raw| raw["vehicleId"].as_str().unwrap().to_string())
            .collect();

        for index in 0..source.vehicles() {
            let expected = source.is_reporting(index, elapsed);
            assert_eq!(
                ids.contains(&DemoSource::vehicle_id(index)),
                expected,
                "TRUCK index {} at {}s",
                index,
                elapsed
            );
            // Only depot-parked units ever go silent
            if !expected {
                assert_eq!(source.leg_for(index, elapsed), LegKind::Depot);
            }
        }
    }
}

#[test]
fn test_some_units_go_silent() {
    let source = DemoSource::new(8);
    // One full lap of the route is well under 15 minutes
    let silent_somewhere = (0..900)
        .any(|t| source.samples_at(t as f64, now()).len() < 8);
    assert!(silent_somewhere, "a powered-down unit should skip reports");
}

#[test]
fn test_samples_normalize_cleanly() {
    let source = DemoSource::new(10);

    for raw in source.samples_at(300.0, now()) {
        let sample = normalize(&raw, now());
        assert!(sample.vehicle_id.starts_with("TRUCK-"));
        assert!(sample.timestamp <= now());
        assert!(now() - sample.timestamp < chrono::TimeDelta::seconds(5));
        assert!(sample.signals.speed.0 >= 0.0);
        assert!((0.0..=100.0).contains(&sample.signals.fuel.0));
        assert!(sample.signals.tire_pressure.0 > 30.0);
        assert_ne!(sample.specs.make, "Unknown");
    }
}

#[test]
fn test_loop_triggers_every_alert_kind() {
    let source = DemoSource::new(8);
    let mut saw_hot = false;
    let mut saw_low_fuel = false;

    for t in (0..3600).step_by(5) {
        for raw in source.samples_at(t as f64, now()) {
            let signals = &raw["signals"];
            saw_hot |= signals["engineTemp"].as_f64().unwrap() > 90.0;
            saw_low_fuel |= signals["fuel"].as_f64().unwrap() < 20.0;
        }
    }

    assert!(saw_hot, "some truck should overheat on the climb");
    assert!(saw_low_fuel, "some truck should run low on fuel");
}

#[test]
fn test_workshop_truck_reports_maintenance() {
    let source = DemoSource::new(10);
    let mut engine = FleetEngine::default();
    engine.ingest(&source.samples_at(200.0, now()), now());

    let snapshot = engine.snapshot(now());
    assert_eq!(snapshot.metrics.maintenance_count, 1);

    let truck = snapshot.vehicle("TRUCK-010").unwrap();
    assert_eq!(truck.latest_sample.signals.speed.0, 0.0);
}

#[tokio::test]
async fn test_fetch_all_uses_wall_clock() {
    let source = DemoSource::new(8);
    let before = Utc::now();
    let samples = source.fetch_all().await.unwrap();

    // Freshly started demo: everyone is near the depot
    assert!(!samples.is_empty());
    for raw in &samples {
        let sample = normalize(raw, Utc::now());
        assert!(before - sample.timestamp < chrono::TimeDelta::seconds(5));
    }
}
