//! Flight horizon (C6): which scheduled flights are plausibly in the air
//! right now, and how far along they are.

use crate::route::Route;
use chrono::{DateTime, TimeZone, Utc};

/// A flight as reported by an external source adapter (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFlight {
    pub id: String,
    pub operator_iata: String,
    pub operator_icao: String,
    pub flight_number: i64,
    pub route: Route,
    pub departure: Option<DateTime<Utc>>,
    pub arrival: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub cancelled: bool,
    pub diverted: bool,
    pub redundant: bool,
    pub overlap: bool,
}

impl ScheduledFlight {
    pub fn is_valid(&self) -> bool {
        self.flight_number > 0 && self.route.codes().len() >= 2
    }
}

/// `max_duration(d) = 0.00486 * d + 1500` seconds, where `d` is the route's
/// total geodesic length in metres.
pub fn max_duration_seconds(route_length_m: f64) -> f64 {
    0.00486 * route_length_m + 1500.0
}

const ARRIVAL_GRACE_SECONDS: i64 = 300;

/// Whether `flight` is plausibly airborne at `t`, per §4.6.
///
/// `route_length_m` is the route's total geodesic length, needed by the
/// single-endpoint branches' `max_duration` formula.
pub fn is_active(flight: &ScheduledFlight, t: DateTime<Utc>, route_length_m: f64) -> bool {
    if flight.cancelled || flight.redundant {
        return false;
    }
    match (flight.departure, flight.arrival) {
        (Some(departure), Some(arrival)) => departure < t && t < arrival,
        (Some(departure), None) => {
            let max_duration = max_duration_seconds(route_length_m);
            departure < t && (departure + chrono::Duration::seconds(max_duration as i64)) > t
        }
        (None, Some(arrival)) => {
            let max_duration = max_duration_seconds(route_length_m);
            arrival > t - chrono::Duration::seconds(ARRIVAL_GRACE_SECONDS)
                && (arrival - chrono::Duration::seconds(max_duration as i64)) < t
        }
        (None, None) => false,
    }
}

/// Coarse pre-filter window in seconds, applied before the per-flight
/// predicate as an optimisation (§4.6).
pub const PRE_FILTER_WINDOW_SECONDS: i64 = 24 * 3600;

/// Cheap pre-filter: does the flight's stored departure/arrival window fall
/// within `±PRE_FILTER_WINDOW_SECONDS` (or `±300s` for arrival-only) of `t`?
/// A `true` result does not guarantee `is_active`; a `false` result does
/// guarantee the flight can be skipped without running the full predicate.
pub fn passes_pre_filter(flight: &ScheduledFlight, t: DateTime<Utc>) -> bool {
    let window = chrono::Duration::seconds(PRE_FILTER_WINDOW_SECONDS);
    let grace = chrono::Duration::seconds(ARRIVAL_GRACE_SECONDS);
    match (flight.departure, flight.arrival) {
        (Some(departure), Some(arrival)) => departure - window < t && t < arrival + window,
        (Some(departure), None) => departure - window < t && t < departure + window,
        (None, Some(arrival)) => arrival - window < t && t < arrival + window + grace,
        (None, None) => false,
    }
}

/// Fraction of the scheduled flight's duration elapsed at `t`, per §4.6.
pub fn estimate_progress(flight: &ScheduledFlight, t: DateTime<Utc>, route_length_m: f64) -> f64 {
    match (flight.departure, flight.arrival) {
        (Some(departure), Some(arrival)) => {
            let total = (arrival - departure).num_milliseconds() as f64;
            if total <= 0.0 {
                return 0.0;
            }
            (t - departure).num_milliseconds() as f64 / total
        }
        (Some(departure), None) => {
            let max_duration = max_duration_seconds(route_length_m);
            (t - departure).num_milliseconds() as f64 / (max_duration * 1000.0)
        }
        (None, Some(arrival)) => {
            let max_duration = max_duration_seconds(route_length_m);
            let assumed_departure = arrival - chrono::Duration::seconds(max_duration as i64);
            (t - assumed_departure).num_milliseconds() as f64 / (max_duration * 1000.0)
        }
        (None, None) => 0.0,
    }
}

/// Merges two adjacent scheduled-flight legs sharing an airport into a
/// single through-route, for connecting itineraries reported by a source
/// as separate legs. Not used by the matcher's hot path — the matcher
/// operates leg-by-leg — this is a helper for source adapters that need to
/// present a single through-flight to callers.
///
/// Returns `None` if the legs don't share an airport (first's last code
/// must equal second's first code) or the combined duration would exceed
/// 18 hours.
pub fn combine_flights(first: &ScheduledFlight, second: &ScheduledFlight) -> Option<ScheduledFlight> {
    let route = combine_routes(&first.route, &second.route)?;

    let departure = first.departure;
    let arrival = second.arrival;
    if let (Some(departure), Some(arrival)) = (departure, arrival) {
        let duration = arrival - departure;
        if duration > chrono::Duration::hours(18) || duration < chrono::Duration::zero() {
            return None;
        }
    }

    Some(ScheduledFlight {
        id: format!("{}+{}", first.id, second.id),
        operator_iata: first.operator_iata.clone(),
        operator_icao: first.operator_icao.clone(),
        flight_number: first.flight_number,
        route,
        departure,
        arrival,
        status: second.status.clone(),
        cancelled: first.cancelled || second.cancelled,
        diverted: first.diverted || second.diverted,
        redundant: false,
        overlap: false,
    })
}

/// Combines two routes sharing a junction airport (`first`'s last code ==
/// `second`'s first code) into a single through-route. Returns `None` if
/// the routes don't share that junction.
pub fn combine_routes(first: &Route, second: &Route) -> Option<Route> {
    let first_codes = first.codes();
    let second_codes = second.codes();
    let junction_a = first_codes.last()?;
    let junction_b = second_codes.first()?;
    if !junction_a.eq_ignore_ascii_case(junction_b) {
        return None;
    }
    let mut combined: Vec<String> = first_codes.to_vec();
    combined.extend_from_slice(&second_codes[1..]);
    Route::parse(&combined.join("-"))
}

#[allow(dead_code)]
fn ymd(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap()
}
