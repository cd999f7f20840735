//! Type-safe wrappers for vehicle signal units
//!
//! Newtype wrappers around f64 so a speed can't be compared against a
//! temperature threshold by accident.
//!
//! All unit types serialize with 4 decimal places to keep snapshot JSON compact.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10000.0).round() / 10000.0)
}

/// Kilometers per hour
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct KilometersPerHour(#[serde(serialize_with = "round4")] pub f64);

/// Degrees Celsius
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round4")] pub f64);

/// Revolutions per minute
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round4")] pub f64);

/// Pounds per square inch (tyre pressure)
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Psi(#[serde(serialize_with = "round4")] pub f64);

/// Fill level in percent (0.0 to 100.0)
///
/// Producers report fuel as a percentage of tank capacity. Values above 100
/// are kept as reported; only negative and non-finite readings are rejected
/// upstream by the normalizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round4")] pub f64);
