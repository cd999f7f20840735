//! Integration tests for the PushSource buffer

use chrono::Utc;
use fleet_core::model::AlertKind;
use fleet_core::{FleetEngine, TelemetrySource};
use fleet_sources::PushSource;
use serde_json::json;

#[tokio::test]
async fn test_fetch_drains_buffer() {
    let source = PushSource::new(10);
    let handle = source.handle();

    handle.push(json!({"vehicleId": "V1"})).await;
    handle.push(json!({"vehicleId": "V2"})).await;
    assert_eq!(handle.pending().await, 2);

    let samples = source.fetch_all().await.unwrap();
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0]["vehicleId"], "V1");
    assert_eq!(samples[1]["vehicleId"], "V2");

    assert_eq!(handle.pending().await, 0);
    assert!(source.fetch_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_overflow_drops_oldest() {
    let source = PushSource::new(3);
    let handle = source.handle();

    let receipt = handle
        .push_many((1..=5).map(|i| json!({"vehicleId": format!("V{}", i)})).collect())
        .await;
    assert_eq!(receipt.accepted, 5);
    assert_eq!(receipt.dropped, 2);

    let ids: Vec<_> = source
        .fetch_all()
        .await
        .unwrap()
        .into_iter()
        .map(|raw| raw["vehicleId"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["V3", "V4", "V5"]);
}

#[tokio::test]
async fn test_cloned_handles_share_buffer() {
    let source = PushSource::new(10);
    let a = source.handle();
    let b = a.clone();

    a.push(json!({"vehicleId": "A"})).await;
    b.push(json!({"vehicleId": "B"})).await;

    assert_eq!(source.fetch_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetch_vehicle_leaves_buffer_intact() {
    let source = PushSource::new(10);
    let handle = source.handle();
    handle.push(json!({"vehicleId": "V1", "signals": {"speed": 12}})).await;
    handle.push(json!({"vehicleId": "V2", "signals": {"fuel": 5}})).await;
    handle.push(json!({"vehicleId": "V1", "signals": {"speed": 40}})).await;

    // Newest buffered sample for the vehicle wins
    let found = source.fetch_vehicle("V1").await.unwrap().unwrap();
    assert_eq!(found["signals"]["speed"], 40);
    assert!(source.fetch_vehicle("V9").await.unwrap().is_none());
    assert_eq!(handle.pending().await, 3);

    // Everything still reaches the engine on the next poll
    let mut engine = FleetEngine::default();
    let now = Utc::now();
    engine.ingest(&source.fetch_all().await.unwrap(), now);
    let snapshot = engine.snapshot(now);
    assert_eq!(snapshot.metrics.total_vehicles, 2);
    assert!(snapshot
        .alerts
        .iter()
        .any(|a| a.vehicle_id == "V2" && a.kind == AlertKind::LowFuel));
}
