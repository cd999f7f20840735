//! Demo source that generates a synthetic delivery fleet for testing
//!
//! Every truck drives the same delivery route (depot, city streets, highway,
//! a long climb, a loading stop) with its own phase offset. The output is a
//! pure function of elapsed time, so a given instant always produces the
//! same fleet. Along the way the fleet exercises every engine path:
//! - trucks overheat on the climb (HighEngineTemp)
//! - tanks drain until they're refilled (LowFuel)
//! - some telematics units power down at the depot (vehicles go stale)
//! - one truck in ten sits in the workshop reporting MAINTENANCE

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use fleet_core::{RawSample, SourceError, TelemetrySource};
use serde_json::json;
use std::f64::consts::TAU;
use std::time::Instant;

// =============================================================================
// Route definition: a sequence of legs that form one delivery loop
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegKind {
    Depot,   // Parked, engine off
    Urban,   // Stop-and-go city driving
    Highway, // Steady cruising
    Climb,   // Long grade under full load
    Loading, // Parked at a customer, engine idling
}

#[derive(Clone, Copy)]
struct RouteLeg {
    kind: LegKind,
    duration: f64,     // seconds
    target_speed: f64, // km/h at end of leg
    engine_load: f64,  // 0.0 to 1.0
}

/// One loop is ~11 minutes so a short demo session sees every leg
fn delivery_route() -> Vec<RouteLeg> {
    vec![
        // Depot long enough for a powered-down unit to go stale
        RouteLeg { kind: LegKind::Depot,   duration: 120.0, target_speed: 0.0,  engine_load: 0.0 },
        RouteLeg { kind: LegKind::Urban,   duration: 90.0,  target_speed: 35.0, engine_load: 0.4 },
        RouteLeg { kind: LegKind::Highway, duration: 150.0, target_speed: 85.0, engine_load: 0.6 },
        RouteLeg { kind: LegKind::Climb,   duration: 60.0,  target_speed: 55.0, engine_load: 1.0 },
        RouteLeg { kind: LegKind::Highway, duration: 90.0,  target_speed: 88.0, engine_load: 0.6 },
        RouteLeg { kind: LegKind::Loading, duration: 45.0,  target_speed: 0.0,  engine_load: 0.1 },
        RouteLeg { kind: LegKind::Urban,   duration: 75.0,  target_speed: 30.0, engine_load: 0.4 },
    ]
}

/// Seconds between consecutive trucks on the route
const PHASE_OFFSET_SECS: f64 = 37.0;

/// A full tank lasts half an hour of demo time for the thriftiest truck
const TANK_SECS: f64 = 1800.0;

const MAKES: [(&str, &str, &str); 4] = [
    ("Scania", "R500", "DC13"),
    ("Volvo", "FH16", "D16G"),
    ("Mercedes", "Actros", "OM471"),
    ("MAN", "TGX", "D26"),
];

// =============================================================================
// Interpolation state, derived from route position
// =============================================================================

struct LegState {
    kind: LegKind,
    speed: f64,
    engine_load: f64,
    progress: f64, // 0.0 to 1.0 around the whole loop
}

fn compute_leg_state(route: &[RouteLeg], route_time: f64) -> LegState {
    let loop_duration: f64 = route.iter().map(|l| l.duration).sum();
    let t = route_time.rem_euclid(loop_duration);

    // Find current leg
    let mut elapsed = 0.0;
    let mut leg_idx = route.len() - 1;
    for (i, leg) in route.iter().enumerate() {
        if elapsed + leg.duration > t {
            leg_idx = i;
            break;
        }
        elapsed += leg.duration;
    }

    let leg = route[leg_idx];
    let leg_t = ((t - elapsed) / leg.duration).clamp(0.0, 1.0);

    let prev_target_speed = if leg_idx > 0 {
        route[leg_idx - 1].target_speed
    } else {
        route[route.len() - 1].target_speed
    };

    let speed = match leg.kind {
        // Parked legs stop immediately instead of coasting to zero
        LegKind::Depot | LegKind::Loading => 0.0,
        _ => lerp(prev_target_speed, leg.target_speed, smoothstep(leg_t)),
    };

    LegState {
        kind: leg.kind,
        speed,
        engine_load: leg.engine_load,
        progress: t / loop_duration,
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

fn speed_to_rpm(speed_kph: f64, engine_running: bool) -> f64 {
    if !engine_running {
        return 0.0;
    }
    if speed_kph < 1.0 {
        return 600.0; // idle
    }
    // 12-speed box: revs climb through each ~8 km/h band then drop a gear ratio
    let band = speed_kph % 8.0;
    1100.0 + band * 90.0
}

// =============================================================================
// Demo Source
// =============================================================================

pub struct DemoSource {
    vehicles: usize,
    start_time: Instant,
    route: Vec<RouteLeg>,
}

impl DemoSource {
    pub fn new(vehicles: usize) -> Self {
        Self {
            vehicles,
            start_time: Instant::now(),
            route: delivery_route(),
        }
    }

    pub fn vehicles(&self) -> usize {
        self.vehicles
    }

    /// Identifier of the truck at `index` (0-based)
    pub fn vehicle_id(index: usize) -> String {
        format!("TRUCK-{:03}", index + 1)
    }

    /// Which leg truck `index` is on `elapsed` seconds into the demo
    pub fn leg_for(&self, index: usize, elapsed: f64) -> LegKind {
        compute_leg_state(&self.route, self.route_time(index, elapsed)).kind
    }

    /// Whether truck `index` reports at all at `elapsed`
    pub fn is_reporting(&self, index: usize, elapsed: f64) -> bool {
        !(Self::powers_down_at_depot(index) && self.leg_for(index, elapsed) == LegKind::Depot)
    }

    /// Fleet output `elapsed` seconds into the demo, stamped relative to `now`
    pub fn samples_at(&self, elapsed: f64, now: DateTime<Utc>) -> Vec<RawSample> {
        (0..self.vehicles)
            .filter(|&i| self.is_reporting(i, elapsed))
            .map(|i| self.generate_sample(i, elapsed, now))
            .collect()
    }

    fn route_time(&self, index: usize, elapsed: f64) -> f64 {
        elapsed + index as f64 * PHASE_OFFSET_SECS
    }

    fn powers_down_at_depot(index: usize) -> bool {
        index % 4 == 3
    }

    fn in_workshop(index: usize) -> bool {
        index % 10 == 9
    }

    fn generate_sample(&self, index: usize, elapsed: f64, now: DateTime<Utc>) -> RawSample {
        let route_time = self.route_time(index, elapsed);
        let state = compute_leg_state(&self.route, route_time);
        let n = route_time + index as f64 * 101.0; // noise seed

        let workshop = Self::in_workshop(index);
        let speed = if workshop {
            0.0
        } else {
            (state.speed + jitter(n, 1.5)).max(0.0)
        };
        let load = if workshop { 0.0 } else { state.engine_load };
        let engine_running = !workshop && state.kind != LegKind::Depot;

        // Some engines run hotter than others; the hottest third crosses 90 °C on the climb
        let heat_bias = (index % 3) as f64 * -1.5;
        let engine_temp = if engine_running {
            70.0 + load * 18.0 + speed * 0.05 + heat_bias + jitter(n * 1.1, 0.4)
        } else {
            // Cooling towards ambient while parked
            40.0 + jitter(n * 1.1, 0.5)
        };

        let drain_rate = 100.0 / TANK_SECS * (1.0 + (index % 4) as f64 * 0.25);
        let fuel = 100.0 - (route_time * drain_rate).rem_euclid(100.0);

        let rpm = speed_to_rpm(speed, engine_running);
        let tire_pressure = 34.0 + load * 1.5 + jitter(n * 1.3, 0.2);

        let (make, model, engine_type) = MAKES[index % MAKES.len()];
        let base_lat = 57.70 + index as f64 * 0.02;
        let base_lon = 11.97 + index as f64 * 0.03;
        let angle = state.progress * TAU;

        let reported_state = if workshop {
            "MAINTENANCE"
        } else if engine_temp > 90.0 {
            "ANOMALY"
        } else {
            "NORMAL"
        };

        // Units buffer a few seconds before uploading
        let timestamp = now - TimeDelta::milliseconds(((noise(n * 1.7) * 3000.0) as i64).max(0));

        json!({
            "vehicleId": Self::vehicle_id(index),
            "timestamp": timestamp.to_rfc3339(),
            "specs": {
                "make": make,
                "model": model,
                "year": 2018 + (index % 7) as i64,
                "engineType": engine_type,
            },
            "signals": {
                "speed": round2(speed),
                "fuel": round2(fuel),
                "engineTemp": round2(engine_temp),
                "rpm": round2(rpm),
                "tirePressure": round2(tire_pressure),
            },
            "status": {
                "isActive": speed > 0.0,
                "state": reported_state,
                "location": {
                    "latitude": base_lat + 0.05 * angle.sin(),
                    "longitude": base_lon + 0.08 * (angle.cos() - 1.0),
                },
            },
        })
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl TelemetrySource for DemoSource {
    fn name(&self) -> &str {
        "demo"
    }

    async fn fetch_all(&self) -> Result<Vec<RawSample>, SourceError> {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        Ok(self.samples_at(elapsed, Utc::now()))
    }
}
