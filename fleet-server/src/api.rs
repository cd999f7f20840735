//! REST API and SSE routes

use crate::scheduler::SchedulerStatus;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use fleet_core::model::{AlertRecord, FleetMetrics, SnapshotMask, VehicleState};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::convert::Infallible;
use tokio_stream::wrappers::WatchStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/snapshot/stream", get(snapshot_stream))
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/vehicles/:id", get(get_vehicle))
        .route("/api/metrics", get(get_metrics))
        .route("/api/alerts", get(get_alerts))
        .route("/api/status", get(get_status))
        .route("/api/telemetry/ingest", post(ingest))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct FieldsQuery {
    fields: Option<String>,
}

type ApiError = (StatusCode, String);

// === Snapshot Endpoints ===

async fn get_snapshot(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Result<Json<Value>, ApiError> {
    let mask = query.fields.map(|f| SnapshotMask::parse(&f));
    let snapshot = state.scheduler.snapshot();

    snapshot
        .to_json_filtered(mask.as_ref())
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to serialize snapshot: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}

async fn snapshot_stream(
    State(state): State<AppState>,
    Query(query): Query<FieldsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mask = query.fields.map(|f| SnapshotMask::parse(&f));

    // Current snapshot first, then one event per publish
    let stream = WatchStream::new(state.scheduler.subscribe()).filter_map(move |snapshot| {
        let event = match snapshot.to_json_filtered(mask.as_ref()) {
            Ok(json) => Some(Ok(Event::default().event("snapshot").data(json.to_string()))),
            Err(e) => {
                tracing::error!("Failed to serialize snapshot: {}", e);
                None
            }
        };
        async move { event }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

// === Read Endpoints ===

async fn list_vehicles(State(state): State<AppState>) -> Json<Vec<VehicleState>> {
    Json(state.scheduler.snapshot().vehicles.clone())
}

async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VehicleState>, ApiError> {
    state
        .scheduler
        .vehicle(&id, Utc::now())
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("Unknown vehicle: {}", id)))
}

async fn get_metrics(State(state): State<AppState>) -> Json<FleetMetrics> {
    Json(state.scheduler.snapshot().metrics.clone())
}

async fn get_alerts(State(state): State<AppState>) -> Json<Vec<AlertRecord>> {
    Json(state.scheduler.snapshot().alerts.clone())
}

async fn get_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

// === Push Ingestion ===

#[derive(Serialize)]
struct IngestResponse {
    accepted: usize,
    dropped: usize,
}

async fn ingest(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let push = state.push.as_ref().ok_or((
        StatusCode::NOT_FOUND,
        "Push ingestion is disabled: the configured source is not `push`".to_string(),
    ))?;

    let samples = match body {
        Value::Object(_) => vec![body],
        Value::Array(items) => {
            if let Some(pos) = items.iter().position(|item| !item.is_object()) {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("Element {} is not a sample object", pos),
                ));
            }
            items
        }
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "Expected a sample object or an array of them".to_string(),
            ))
        }
    };

    let receipt = push.push_many(samples).await;
    tracing::debug!("Ingested {} pushed sample(s)", receipt.accepted);

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            accepted: receipt.accepted,
            dropped: receipt.dropped,
        }),
    ))
}
