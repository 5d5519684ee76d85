//! Black-box integration tests exercising the boundary between C1-C8
//! through the crate's public API: a raw position feed into C3, a
//! scheduled flight into the matcher, and the resulting state of C8.

use chrono::Utc;
use routebind::adapters::{RouteOracle, StaticRouteOracle, StaticTranslationTable};
use routebind::candidate::CandidateStore;
use routebind::matcher::{self, tier, MatcherConfig};
use routebind::observation::{PositionSnapshot, RawAircraftState, RegistrationTable, ValidationPolicy};
use routebind::reference::{AirportRef, ReferenceDirectory};
use routebind::route::{Route, RouteCheckConfig};
use routebind::schedule::ScheduledFlight;
use routebind::store::VerifiedRouteStore;
use std::collections::HashMap;

fn directory() -> ReferenceDirectory {
    let airports = vec![
        AirportRef {
            icao: "EDDF".into(),
            iata: Some("FRA".into()),
            name: "Frankfurt am Main".into(),
            latitude: 50.0333,
            longitude: 8.5706,
            country: "DE".into(),
            timezone: "Europe/Berlin".into(),
        },
        AirportRef {
            icao: "EGLL".into(),
            iata: Some("LHR".into()),
            name: "London Heathrow".into(),
            latitude: 51.4706,
            longitude: -0.4619,
            country: "GB".into(),
            timezone: "Europe/London".into(),
        },
    ];
    ReferenceDirectory::new(airports, vec![])
}

fn active_flight() -> ScheduledFlight {
    ScheduledFlight {
        id: "1".into(),
        operator_iata: "LH".into(),
        operator_icao: "DLH".into(),
        flight_number: 400,
        route: Route::parse("EDDF-EGLL").unwrap(),
        departure: Some(Utc::now() - chrono::Duration::minutes(30)),
        arrival: Some(Utc::now() + chrono::Duration::minutes(30)),
        status: None,
        cancelled: false,
        diverted: false,
        redundant: false,
        overlap: false,
    }
}

fn raw_state_at(callsign: &str, lat: f64, lon: f64, heading: f64) -> RawAircraftState {
    RawAircraftState {
        callsign: Some(callsign.to_string()),
        aircraft_hardware_id: Some("3C1234".to_string()),
        latitude: Some(lat),
        longitude: Some(lon),
        altitude_m: Some(10_000.0),
        heading_deg: Some(heading),
        vertical_rate_ms: Some(0.0),
        ground_speed_ms: Some(230.0),
        on_ground: Some(false),
        observed_at: Some(Utc::now()),
    }
}

/// A raw state, validated by C3, binds a ScheduledFlight through the
/// matcher at tier 5 (S8), and the binding lands in C8.
#[tokio::test]
async fn validated_observation_flows_through_to_a_tier_5_binding() {
    let reference = directory();
    let raw = raw_state_at("DLH400", 51.0, 4.0, 290.0); // roughly mid-route, heading toward EGLL
    let observation = routebind::observation::validate(
        &raw,
        &ValidationPolicy::default(),
        &RegistrationTable::default(),
    )
    .expect("valid raw state should validate");

    let mut positions = HashMap::new();
    positions.insert(observation.callsign.clone(), observation);
    let snapshot = PositionSnapshot::new(positions, Utc::now());

    let candidates = CandidateStore::new();
    let store = VerifiedRouteStore::new(chrono::Duration::hours(3));
    let translation = StaticTranslationTable::default();
    let oracle = StaticRouteOracle::default();

    matcher::run_cycle(
        &reference,
        &RouteCheckConfig::default(),
        &MatcherConfig::default(),
        &snapshot,
        &candidates,
        &store,
        &translation,
        &oracle,
        "integration-source",
        &[active_flight()],
        Utc::now(),
    )
    .await;

    let binding = store
        .get("DLH400", &Route::parse("EDDF-EGLL").unwrap())
        .expect("tier 5 binding should be persisted");
    assert_eq!(binding.tier, tier::DIRECT_SNAPSHOT_HIT);
    assert_eq!(binding.source, "integration-source");
}

/// A scheduled flight whose departure is still in the future: its time
/// progress falls outside the search window, so the matcher must not even
/// attempt a search, regardless of what is or isn't in the snapshot.
fn not_yet_departed_flight() -> ScheduledFlight {
    let mut flight = active_flight();
    flight.departure = Some(Utc::now() + chrono::Duration::minutes(5));
    flight.arrival = Some(Utc::now() + chrono::Duration::minutes(65));
    flight
}

/// A manually malformed raw state (missing ground speed) never reaches the
/// matcher at all: C3 rejects it before a snapshot entry is even created.
/// Paired with a not-yet-departed flight so the matcher's search window
/// guard, not candidate availability, is what is under test here.
#[tokio::test]
async fn incomplete_raw_state_never_reaches_the_matcher() {
    let reference = directory();
    let mut raw = raw_state_at("DLH400", 50.76, 4.05, 280.0);
    raw.ground_speed_ms = None;
    assert!(routebind::observation::validate(
        &raw,
        &ValidationPolicy::default(),
        &RegistrationTable::default()
    )
    .is_none());

    let snapshot = PositionSnapshot::new(HashMap::new(), Utc::now());
    let candidates = CandidateStore::new();
    let store = VerifiedRouteStore::new(chrono::Duration::hours(3));
    let translation = StaticTranslationTable::default();
    let oracle = StaticRouteOracle::default();

    let ambiguous = matcher::run_cycle(
        &reference,
        &RouteCheckConfig::default(),
        &MatcherConfig::default(),
        &snapshot,
        &candidates,
        &store,
        &translation,
        &oracle,
        "integration-source",
        &[not_yet_departed_flight()],
        Utc::now(),
    )
    .await;

    assert!(ambiguous.is_empty());
    assert!(store
        .get("DLH400", &Route::parse("EDDF-EGLL").unwrap())
        .is_none());
}

/// Search mode: the assumed callsign is absent from the snapshot, but a
/// differently-registered aircraft is flying the same geometry and the
/// route oracle confirms it. The matcher should bind it at tier 1.
#[tokio::test]
async fn search_mode_binds_oracle_confirmed_candidate_at_tier_1() {
    let reference = directory();
    let flight = active_flight();

    // Midpoint of EDDF-EGLL, heading toward EGLL - geometrically plausible.
    let raw = raw_state_at("DLH9XQ", 50.76, 4.05, 290.0);
    let observation = routebind::observation::validate(
        &raw,
        &ValidationPolicy::default(),
        &RegistrationTable::default(),
    )
    .unwrap();

    let mut positions = HashMap::new();
    positions.insert(observation.callsign.clone(), observation);
    let snapshot = PositionSnapshot::new(positions, Utc::now());

    let candidates = CandidateStore::new();
    let store = VerifiedRouteStore::new(chrono::Duration::hours(3));
    let translation = StaticTranslationTable::default();

    let mut known_routes = HashMap::new();
    known_routes.insert("DLH9XQ".to_string(), Route::parse("EDDF-EGLL").unwrap());
    let oracle = StaticRouteOracle::new(known_routes);
    assert!(oracle.get_flight_route("DLH9XQ").await.is_some());

    matcher::run_cycle(
        &reference,
        &RouteCheckConfig::default(),
        &MatcherConfig::default(),
        &snapshot,
        &candidates,
        &store,
        &translation,
        &oracle,
        "integration-source",
        &[flight],
        Utc::now(),
    )
    .await;

    let binding = store
        .get("DLH9XQ", &Route::parse("EDDF-EGLL").unwrap())
        .expect("oracle-confirmed candidate should be bound");
    assert_eq!(binding.tier, tier::ORACLE_CONFIRMED_CANDIDATE);
}

/// Search mode with two equally plausible, oracle-confirmed candidates:
/// the matcher must refuse to pick one and report the match as ambiguous.
#[tokio::test]
async fn search_mode_reports_ambiguous_match_when_two_candidates_confirm() {
    let reference = directory();
    let flight = active_flight();

    let raw_a = raw_state_at("DLH1AA", 50.76, 4.05, 290.0);
    let raw_b = raw_state_at("DLH2BB", 50.77, 4.06, 291.0);
    let obs_a = routebind::observation::validate(
        &raw_a,
        &ValidationPolicy::default(),
        &RegistrationTable::default(),
    )
    .unwrap();
    let obs_b = routebind::observation::validate(
        &raw_b,
        &ValidationPolicy::default(),
        &RegistrationTable::default(),
    )
    .unwrap();

    let mut positions = HashMap::new();
    positions.insert(obs_a.callsign.clone(), obs_a);
    positions.insert(obs_b.callsign.clone(), obs_b);
    let snapshot = PositionSnapshot::new(positions, Utc::now());

    let candidates = CandidateStore::new();
    let store = VerifiedRouteStore::new(chrono::Duration::hours(3));
    let translation = StaticTranslationTable::default();

    let mut known_routes = HashMap::new();
    known_routes.insert("DLH1AA".to_string(), Route::parse("EDDF-EGLL").unwrap());
    known_routes.insert("DLH2BB".to_string(), Route::parse("EDDF-EGLL").unwrap());
    let oracle = StaticRouteOracle::new(known_routes);

    let ambiguous = matcher::run_cycle(
        &reference,
        &RouteCheckConfig::default(),
        &MatcherConfig::default(),
        &snapshot,
        &candidates,
        &store,
        &translation,
        &oracle,
        "integration-source",
        &[flight],
        Utc::now(),
    )
    .await;

    assert_eq!(ambiguous.len(), 1);
    assert!(store
        .get("DLH1AA", &Route::parse("EDDF-EGLL").unwrap())
        .is_none());
    assert!(store
        .get("DLH2BB", &Route::parse("EDDF-EGLL").unwrap())
        .is_none());
}

/// Tier precedence across cycles (S8 extended): a tier-5 binding survives a
/// later cycle where the aircraft briefly disappears from the snapshot and
/// a lower-tier candidate would otherwise compete for the same key.
#[tokio::test]
async fn tier_5_binding_survives_across_cycles_until_outdated() {
    let reference = directory();
    let flight = active_flight();
    let route = Route::parse("EDDF-EGLL").unwrap();

    let raw = raw_state_at("DLH400", 50.76, 4.05, 290.0);
    let observation = routebind::observation::validate(
        &raw,
        &ValidationPolicy::default(),
        &RegistrationTable::default(),
    )
    .unwrap();
    let mut positions = HashMap::new();
    positions.insert(observation.callsign.clone(), observation);
    let snapshot_with_hit = PositionSnapshot::new(positions, Utc::now());

    let candidates = CandidateStore::new();
    let store = VerifiedRouteStore::new(chrono::Duration::hours(3));
    let translation = StaticTranslationTable::default();
    let oracle = StaticRouteOracle::default();

    matcher::run_cycle(
        &reference,
        &RouteCheckConfig::default(),
        &MatcherConfig::default(),
        &snapshot_with_hit,
        &candidates,
        &store,
        &translation,
        &oracle,
        "integration-source",
        &[flight.clone()],
        Utc::now(),
    )
    .await;
    assert_eq!(store.get("DLH400", &route).unwrap().tier, tier::DIRECT_SNAPSHOT_HIT);

    // Next cycle: the aircraft has vanished from the snapshot. Since DLH400
    // is now a recent binding, the matcher should skip this flight entirely
    // rather than searching for (and potentially downgrading to) another
    // candidate.
    let empty_snapshot = PositionSnapshot::new(HashMap::new(), Utc::now());
    let ambiguous = matcher::run_cycle(
        &reference,
        &RouteCheckConfig::default(),
        &MatcherConfig::default(),
        &empty_snapshot,
        &candidates,
        &store,
        &translation,
        &oracle,
        "integration-source",
        &[flight],
        Utc::now(),
    )
    .await;

    assert!(ambiguous.is_empty());
    assert_eq!(store.get("DLH400", &route).unwrap().tier, tier::DIRECT_SNAPSHOT_HIT);
}
