//! Fleet telemetry data model
//!
//! Defines the normalized `TelemetrySample` every source is converted to,
//! the per-vehicle `VehicleState`, and the derived outputs (metrics, alerts)
//! bundled into a published `FleetSnapshot`.
//!
//! Wire names are camelCase, matching the producer system's JSON.

use crate::units::*;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Raw sample as delivered by a source, before normalization.
///
/// Any field may be missing, null or of the wrong type.
pub type RawSample = serde_json::Value;

/// One vehicle's reported signals at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    /// Identity key, never empty
    pub vehicle_id: String,

    /// When the sample was taken (ingestion time if the source omitted it)
    pub timestamp: DateTime<Utc>,

    pub specs: VehicleSpecs,

    pub signals: Signals,

    pub status: ReportedStatus,
}

impl TelemetrySample {
    /// Sample with every informational field at its default and all signals zero
    pub fn new(vehicle_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            timestamp,
            specs: VehicleSpecs::unknown(timestamp.year()),
            signals: Signals::default(),
            status: ReportedStatus::default(),
        }
    }

    pub fn with_signals(mut self, signals: Signals) -> Self {
        self.signals = signals;
        self
    }

}

/// Informational vehicle specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSpecs {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub engine_type: String,
}

impl VehicleSpecs {
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn unknown(year: i32) -> Self {
        Self {
            make: Self::UNKNOWN.to_string(),
            model: Self::UNKNOWN.to_string(),
            year,
            engine_type: Self::UNKNOWN.to_string(),
        }
    }
}

/// Live signals; every value is finite and non-negative after normalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signals {
    pub speed: KilometersPerHour,
    pub fuel: Percent,
    pub engine_temp: Celsius,
    pub rpm: Rpm,
    pub tire_pressure: Psi,
}

/// What the vehicle says about itself. Advisory only: the engine derives
/// activity from sample age.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedStatus {
    pub is_active: bool,
    pub location: Location,
    pub state: ReportedState,
}

/// Last reported position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Coordinates { latitude: f64, longitude: f64 },
    Named(String),
}

impl Default for Location {
    fn default() -> Self {
        Location::Named(VehicleSpecs::UNKNOWN.to_string())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Coordinates {
                latitude,
                longitude,
            } => write!(f, "{:.4}, {:.4}", latitude, longitude),
            Location::Named(name) => f.write_str(name),
        }
    }
}

/// Operational state reported by the vehicle (`status.state` on the wire)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportedState {
    Normal,
    Anomaly,
    Maintenance,
    #[default]
    Unknown,
}

impl ReportedState {
    /// Case-insensitive parse; anything unrecognised is `Unknown`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => ReportedState::Normal,
            "anomaly" => ReportedState::Anomaly,
            "maintenance" => ReportedState::Maintenance,
            _ => ReportedState::Unknown,
        }
    }
}

/// Engine-derived liveness of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Active,
    Inactive,
}

/// The engine's live record for one vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    pub vehicle_id: String,
    pub latest_sample: TelemetrySample,
    /// Classified at read time, never carried over from a previous read
    pub derived_status: VehicleStatus,
}

impl VehicleState {
    pub fn is_active(&self) -> bool {
        self.derived_status == VehicleStatus::Active
    }
}

/// Fleet-wide aggregate, recomputed every cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetMetrics {
    pub total_vehicles: usize,
    pub active_vehicles: usize,
    /// Mean speed over active vehicles (km/h)
    pub average_speed: f64,
    /// Mean fuel level over active vehicles (%)
    pub average_fuel: f64,
    /// active / total * 100
    pub fleet_uptime_percent: f64,
    /// Vehicles whose latest sample reports MAINTENANCE
    pub maintenance_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    HighEngineTemp,
    LowFuel,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::HighEngineTemp => f.write_str("HighEngineTemp"),
            AlertKind::LowFuel => f.write_str("LowFuel"),
        }
    }
}

/// A threshold violation detected in the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub vehicle_id: String,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
}

/// Immutable result of one successful cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub vehicles: Vec<VehicleState>,
    pub metrics: FleetMetrics,
    pub alerts: Vec<AlertRecord>,
    pub computed_at: DateTime<Utc>,
}

impl FleetSnapshot {
    /// Snapshot of an engine that has not seen any vehicle yet
    pub fn empty(computed_at: DateTime<Utc>) -> Self {
        Self {
            vehicles: Vec::new(),
            metrics: FleetMetrics::default(),
            alerts: Vec::new(),
            computed_at,
        }
    }

    pub fn vehicle(&self, vehicle_id: &str) -> Option<&VehicleState> {
        self.vehicles.iter().find(|v| v.vehicle_id == vehicle_id)
    }
}

// === Section Masking for Selective Output ===

/// Specifies which snapshot sections to include in serialized output
///
/// Dashboards polling only the headline numbers don't need every vehicle's
/// full sample on each request.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMask {
    sections: HashSet<String>,
    include_all: bool,
}

impl SnapshotMask {
    /// Create a mask that includes every section
    pub fn all() -> Self {
        Self {
            sections: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of section names
    pub fn parse(sections: &str) -> Self {
        let sections: HashSet<String> = sections
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            sections,
            include_all: false,
        }
    }

    pub fn includes(&self, section: &str) -> bool {
        self.include_all || self.sections.contains(&section.to_lowercase())
    }

    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl FromStr for SnapshotMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl FleetSnapshot {
    /// Serialize this snapshot respecting the given mask
    ///
    /// `computedAt` is always present so a reader can judge freshness
    /// whatever it asked for.
    pub fn to_json_filtered(
        &self,
        mask: Option<&SnapshotMask>,
    ) -> serde_json::Result<serde_json::Value> {
        let mask = match mask {
            Some(m) if !m.is_all() => m,
            _ => return serde_json::to_value(self),
        };

        let mut map = serde_json::Map::new();
        map.insert(
            "computedAt".to_string(),
            serde_json::to_value(self.computed_at)?,
        );
        if mask.includes("vehicles") {
            map.insert("vehicles".to_string(), serde_json::to_value(&self.vehicles)?);
        }
        if mask.includes("metrics") {
            map.insert("metrics".to_string(), serde_json::to_value(&self.metrics)?);
        }
        if mask.includes("alerts") {
            map.insert("alerts".to_string(), serde_json::to_value(&self.alerts)?);
        }

        Ok(serde_json::Value::Object(map))
    }
}
