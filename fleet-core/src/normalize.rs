//! Raw sample validation and defaulting
//!
//! `normalize` never fails. Whatever a source hands over, the result is a
//! fully-populated `TelemetrySample`:
//! - numbers that are absent, non-numeric, negative or non-finite become 0
//! - a missing or unparseable timestamp becomes the ingestion time
//! - missing descriptive strings become "Unknown"
//!
//! Timestamps may be RFC 3339 strings, ISO-8601 strings without an offset
//! (read as UTC), or numeric epoch milliseconds.

use crate::model::*;
use crate::units::*;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Accepted spellings for each signal; the first present one wins
const SPEED_KEYS: &[&str] = &["speed"];
const FUEL_KEYS: &[&str] = &["fuel", "fuel_level", "fuelLevel"];
const ENGINE_TEMP_KEYS: &[&str] = &["engineTemp", "engine_temp"];
const RPM_KEYS: &[&str] = &["rpm"];
const TIRE_PRESSURE_KEYS: &[&str] = &["tirePressure", "tire_pressure"];

/// Clean a raw sample, using `ingested_at` for anything time-related
/// the source left out.
pub fn normalize(raw: &RawSample, ingested_at: DateTime<Utc>) -> TelemetrySample {
    let mut defaulted: Vec<&'static str> = Vec::new();
    let root = raw.as_object();

    let vehicle_id = match root.and_then(|o| o.get("vehicleId")).and_then(parse_vehicle_id) {
        Some(id) => id,
        None => {
            defaulted.push("vehicleId");
            VehicleSpecs::UNKNOWN.to_string()
        }
    };

    let timestamp = match root.and_then(|o| o.get("timestamp")).and_then(parse_timestamp) {
        Some(ts) => ts,
        None => {
            defaulted.push("timestamp");
            ingested_at
        }
    };

    let specs = normalize_specs(section(root, "specs"), ingested_at.year());
    let signals = normalize_signals(section(root, "signals"), &mut defaulted);
    let status = normalize_status(section(root, "status"));

    if !defaulted.is_empty() {
        debug!(
            vehicle_id = %vehicle_id,
            fields = ?defaulted,
            "Defaulted malformed sample fields"
        );
    }

    TelemetrySample {
        vehicle_id,
        timestamp,
        specs,
        signals,
        status,
    }
}

/// Vehicle id as `normalize` would read it, without building the sample
pub fn raw_vehicle_id(raw: &RawSample) -> Option<String> {
    raw.get("vehicleId").and_then(parse_vehicle_id)
}

/// Normalize a whole fetch result with a single ingestion instant
pub fn normalize_batch(raws: &[RawSample], ingested_at: DateTime<Utc>) -> Vec<TelemetrySample> {
    raws.iter().map(|raw| normalize(raw, ingested_at)).collect()
}

fn section<'a>(root: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Map<String, Value>> {
    root.and_then(|o| o.get(key)).and_then(Value::as_object)
}

/// First non-null value among `keys`
fn field<'a>(obj: Option<&'a Map<String, Value>>, keys: &[&str]) -> Option<&'a Value> {
    let obj = obj?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn parse_vehicle_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(ms) => ms,
                None => {
                    let ms = n.as_f64()?;
                    if !ms.is_finite() {
                        return None;
                    }
                    ms as i64
                }
            };
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-negative finite number, or None
fn signal_value(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
}

fn normalize_specs(specs: Option<&Map<String, Value>>, default_year: i32) -> VehicleSpecs {
    let text = |keys: &[&str]| {
        non_empty_string(field(specs, keys)).unwrap_or_else(|| VehicleSpecs::UNKNOWN.to_string())
    };

    let year = field(specs, &["year"])
        .and_then(Value::as_i64)
        .and_then(|y| i32::try_from(y).ok())
        .filter(|y| *y > 0)
        .unwrap_or(default_year);

    VehicleSpecs {
        make: text(&["make"]),
        model: text(&["model"]),
        year,
        engine_type: text(&["engineType", "engine_type"]),
    }
}

fn normalize_signals(
    signals: Option<&Map<String, Value>>,
    defaulted: &mut Vec<&'static str>,
) -> Signals {
    let mut read = |name: &'static str, keys: &[&str]| -> f64 {
        let raw = field(signals, keys);
        match signal_value(raw) {
            Some(v) => v,
            None => {
                // Absent signals are routine; only record values that were present but bad.
                if raw.is_some() {
                    defaulted.push(name);
                }
                0.0
            }
        }
    };

    Signals {
        speed: KilometersPerHour(read("speed", SPEED_KEYS)),
        fuel: Percent(read("fuel", FUEL_KEYS)),
        engine_temp: Celsius(read("engineTemp", ENGINE_TEMP_KEYS)),
        rpm: Rpm(read("rpm", RPM_KEYS)),
        tire_pressure: Psi(read("tirePressure", TIRE_PRESSURE_KEYS)),
    }
}

fn normalize_status(status: Option<&Map<String, Value>>) -> ReportedStatus {
    let is_active = field(status, &["isActive"])
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let location = match field(status, &["location"]) {
        Some(Value::String(s)) if !s.trim().is_empty() => Location::Named(s.trim().to_string()),
        Some(Value::Object(coords)) => {
            let lat = coords.get("latitude").and_then(Value::as_f64);
            let lon = coords.get("longitude").and_then(Value::as_f64);
            match (lat, lon) {
                (Some(latitude), Some(longitude))
                    if latitude.is_finite() && longitude.is_finite() =>
                {
                    Location::Coordinates {
                        latitude,
                        longitude,
                    }
                }
                _ => Location::default(),
            }
        }
        _ => Location::default(),
    };

    let state = field(status, &["state"])
        .and_then(Value::as_str)
        .map(ReportedState::parse)
        .unwrap_or_default();

    ReportedStatus {
        is_active,
        location,
        state,
    }
}
