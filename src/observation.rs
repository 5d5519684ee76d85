//! Position validator (C3): turns a raw aircraft state into a usable
//! `Observation`, or rejects it.

use crate::callsign::{self, CallsignPolicy};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Default maximum accepted flight level (the ceiling used by Concorde).
/// `ValidationPolicy::max_flight_level` is the effective, configurable cap.
pub const MAX_FLIGHT_LEVEL: i32 = 600;

/// Raw aircraft state as published by the external position feed, before
/// validation. Every field is optional because upstream data is frequently
/// incomplete.
#[derive(Debug, Clone, Default)]
pub struct RawAircraftState {
    pub callsign: Option<String>,
    pub aircraft_hardware_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
    pub heading_deg: Option<f64>,
    pub vertical_rate_ms: Option<f64>,
    pub ground_speed_ms: Option<f64>,
    pub on_ground: Option<bool>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// A single validated aircraft state at a moment in time (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub callsign: String,
    pub operator_icao: String,
    pub aircraft_hardware_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
    pub flight_level: i32,
    pub heading_deg: f64,
    pub vertical_rate_ms: f64,
    pub ground_speed_ms: f64,
    pub on_ground: bool,
    pub observed_at: DateTime<Utc>,
    pub numeric_suffix: Option<i64>,
    pub registration: Option<String>,
}

/// Policy controlling what `validate` accepts, mirroring C2's policy plus
/// the position-specific on-ground rule.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub callsign_policy: CallsignPolicy,
    pub allow_on_ground: bool,
    pub max_flight_level: i32,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            callsign_policy: CallsignPolicy::permissive(),
            allow_on_ground: false,
            max_flight_level: MAX_FLIGHT_LEVEL,
        }
    }
}

/// A read-only table mapping aircraft hardware ids to registrations, with
/// no online refresh implemented here — a production deployment would
/// refresh this from an external metadata service, which is out of scope.
#[derive(Debug, Clone, Default)]
pub struct RegistrationTable {
    by_hardware_id: HashMap<String, String>,
}

impl RegistrationTable {
    pub fn new(by_hardware_id: HashMap<String, String>) -> Self {
        Self { by_hardware_id }
    }

    pub fn lookup(&self, hardware_id: &str) -> Option<String> {
        self.by_hardware_id.get(hardware_id).cloned()
    }
}

/// Validates a raw aircraft state into an `Observation`, applying C2 to the
/// callsign and requiring every other field to be present.
pub fn validate(
    raw: &RawAircraftState,
    policy: &ValidationPolicy,
    registrations: &RegistrationTable,
) -> Option<Observation> {
    let callsign_check = callsign::normalize(raw.callsign.as_deref()?, &policy.callsign_policy)?;

    let latitude = raw.latitude?;
    let longitude = raw.longitude?;
    let altitude_m = raw.altitude_m?;
    let heading_deg = raw.heading_deg?;
    let vertical_rate_ms = raw.vertical_rate_ms?;
    let ground_speed_ms = raw.ground_speed_ms?;
    let observed_at = raw.observed_at?;
    let aircraft_hardware_id = raw.aircraft_hardware_id.clone()?;
    let on_ground = raw.on_ground?;

    if on_ground && !policy.allow_on_ground {
        return None;
    }

    let flight_level = (altitude_m / 0.3048 / 100.0).round() as i32;
    if flight_level > policy.max_flight_level {
        return None;
    }

    let registration = registrations.lookup(&aircraft_hardware_id);

    Some(Observation {
        callsign: callsign_check.callsign,
        operator_icao: callsign_check.operator_icao,
        aircraft_hardware_id,
        latitude,
        longitude,
        altitude_m,
        flight_level,
        heading_deg,
        vertical_rate_ms,
        ground_speed_ms,
        on_ground,
        observed_at,
        numeric_suffix: callsign_check.numeric_suffix,
        registration,
    })
}

/// A point-in-time, atomically-published set of observations keyed by
/// canonical callsign (§6 inbound position snapshot).
#[derive(Debug, Clone, Default)]
pub struct PositionSnapshot {
    pub positions: HashMap<String, Observation>,
    pub states_time: DateTime<Utc>,
}

impl PositionSnapshot {
    pub fn new(positions: HashMap<String, Observation>, states_time: DateTime<Utc>) -> Self {
        Self {
            positions,
            states_time,
        }
    }

    pub fn get(&self, callsign: &str) -> Option<&Observation> {
        self.positions.get(callsign)
    }

    /// Observations whose operator prefix matches `operator_icao`.
    pub fn by_operator<'a>(&'a self, operator_icao: &'a str) -> impl Iterator<Item = &'a Observation> {
        self.positions
            .values()
            .filter(move |obs| obs.operator_icao == operator_icao)
    }
}
