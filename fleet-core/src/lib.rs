//! Fleet Telemetry Core Library
//!
//! This crate provides the telemetry data model and the aggregation engine:
//! sample normalization, the latest-sample-per-vehicle store, time-based
//! staleness, fleet metrics and threshold alerts. It also defines the
//! `TelemetrySource` trait that producer clients implement.

pub mod alerts;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod source;
pub mod staleness;
pub mod store;
pub mod units;

pub use config::EngineConfig;
pub use engine::FleetEngine;
pub use error::{ConfigError, SourceError};
pub use model::{FleetSnapshot, RawSample, TelemetrySample, VehicleState};
pub use source::TelemetrySource;
