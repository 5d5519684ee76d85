//! Matcher (C7): for each active scheduled flight, finds the callsign
//! among currently observed aircraft, assigns a quality tier, and manages
//! candidate sets across polling cycles.

use crate::adapters::{RouteOracle, TranslationTable};
use crate::candidate::{candidate_key, CandidateStore};
use crate::observation::PositionSnapshot;
use crate::reference::ReferenceDirectory;
use crate::route::{check_route, RouteCheckConfig};
use crate::schedule::{estimate_progress, ScheduledFlight};
use crate::store::{VerifiedBinding, VerifiedRouteStore};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Quality tiers assigned by the matcher (§4.7).
pub mod tier {
    pub const DIRECT_SNAPSHOT_HIT: u8 = 5;
    pub const TRANSLATED_HIT: u8 = 3;
    pub const ORACLE_CONFIRMED_CANDIDATE: u8 = 1;
    pub const LOW_CONFIDENCE_CANDIDATE: u8 = 0;
}

#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    pub min_recent_tier: u8,
    pub recent_callsigns_window_hours: i64,
    pub search_progress_window: (f64, f64),
    pub search_time_progress_bounds: (f64, f64),
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_recent_tier: 1,
            recent_callsigns_window_hours: 48,
            // leg.progress - time_progress must fall in (-0.4, 0.2).
            search_progress_window: (-0.4, 0.2),
            // oracle-filtering step only runs when 0.1 < time_progress < 1.
            search_time_progress_bounds: (0.1, 1.0),
        }
    }
}

/// Diagnostic emitted when step 5 cannot settle on a single candidate
/// (§4.7, §7).
#[derive(Debug, Clone)]
pub struct AmbiguousMatch {
    pub operator_iata: String,
    pub flight_number: i64,
    pub route: String,
    pub first_set: Vec<String>,
    pub second_set: Vec<String>,
}

/// Runs one matcher cycle for a single data source's active flights,
/// writing accepted bindings into `store` and returning any ambiguous
/// matches encountered (§4.7 step 5).
#[allow(clippy::too_many_arguments)]
pub async fn run_cycle(
    reference: &ReferenceDirectory,
    route_config: &RouteCheckConfig,
    matcher_config: &MatcherConfig,
    snapshot: &PositionSnapshot,
    candidates: &CandidateStore,
    store: &VerifiedRouteStore,
    translation: &dyn TranslationTable,
    oracle: &dyn RouteOracle,
    source_label: &str,
    flights: &[ScheduledFlight],
    t: DateTime<Utc>,
) -> Vec<AmbiguousMatch> {
    let mut ambiguous = Vec::new();
    let recent_bindings = store.recent_callsigns(
        matcher_config.min_recent_tier,
        matcher_config.recent_callsigns_window_hours,
    );

    for flight in flights {
        if !flight.is_valid() || !flight.route.is_valid(reference) {
            continue;
        }
        if let Some(diagnostic) = process_flight(
            reference,
            route_config,
            matcher_config,
            snapshot,
            candidates,
            store,
            translation,
            oracle,
            source_label,
            flight,
            &recent_bindings,
            t,
        )
        .await
        {
            ambiguous.push(diagnostic);
        }
    }

    ambiguous
}

#[allow(clippy::too_many_arguments)]
async fn process_flight(
    reference: &ReferenceDirectory,
    route_config: &RouteCheckConfig,
    matcher_config: &MatcherConfig,
    snapshot: &PositionSnapshot,
    candidates: &CandidateStore,
    store: &VerifiedRouteStore,
    translation: &dyn TranslationTable,
    oracle: &dyn RouteOracle,
    source_label: &str,
    flight: &ScheduledFlight,
    recent_bindings: &HashSet<String>,
    t: DateTime<Utc>,
) -> Option<AmbiguousMatch> {
    let assumed = format!("{}{}", flight.operator_icao, flight.flight_number);
    let translated = translation.get(&assumed);

    enum Selected {
        Direct { callsign: String, tier: u8 },
        Search,
    }

    let selected = if snapshot.get(&assumed).is_some() {
        Selected::Direct {
            callsign: assumed.clone(),
            tier: tier::DIRECT_SNAPSHOT_HIT,
        }
    } else if recent_bindings.contains(&assumed) {
        return None;
    } else if let Some(translated) = &translated {
        if snapshot.get(translated).is_some() {
            Selected::Direct {
                callsign: translated.clone(),
                tier: tier::TRANSLATED_HIT,
            }
        } else if recent_bindings.contains(translated) {
            return None;
        } else {
            Selected::Search
        }
    } else {
        Selected::Search
    };

    match selected {
        Selected::Direct { callsign, tier } => {
            let observation = snapshot.get(&callsign)?;
            let result = check_route(reference, route_config, observation, &flight.route)?;
            if result.check_failed {
                store.increase_error(&callsign, &flight.route);
            } else {
                store.put(
                    VerifiedBinding {
                        callsign,
                        route: flight.route.clone(),
                        source: source_label.to_string(),
                        operator_icao: flight.operator_icao.clone(),
                        operator_iata: flight.operator_iata.clone(),
                        flight_number: flight.flight_number,
                        tier,
                        error_count: 0,
                        update_time: t,
                        valid_from: t,
                    },
                    false,
                );
            }
            None
        }
        Selected::Search => {
            search(
                reference,
                route_config,
                matcher_config,
                snapshot,
                candidates,
                store,
                oracle,
                source_label,
                flight,
                recent_bindings,
                t,
            )
            .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn search(
    reference: &ReferenceDirectory,
    route_config: &RouteCheckConfig,
    matcher_config: &MatcherConfig,
    snapshot: &PositionSnapshot,
    candidates: &CandidateStore,
    store: &VerifiedRouteStore,
    oracle: &dyn RouteOracle,
    source_label: &str,
    flight: &ScheduledFlight,
    recent_bindings: &HashSet<String>,
    t: DateTime<Utc>,
) -> Option<AmbiguousMatch> {
    let key = candidate_key(&flight.operator_iata, flight.flight_number, &flight.route);
    let route_length_m = flight.route.total_length_m(reference)?;
    let time_progress = estimate_progress(flight, t, route_length_m);

    for observation in snapshot.by_operator(&flight.operator_icao) {
        if recent_bindings.contains(&observation.callsign) {
            continue;
        }
        let Some(result) = check_route(reference, route_config, observation, &flight.route) else {
            continue;
        };
        if result.check_failed {
            candidates.add_failed_candidate(&key, &observation.callsign);
            store.increase_error(&observation.callsign, &flight.route);
        } else {
            let delta = result.progress - time_progress;
            if delta > matcher_config.search_progress_window.0
                && delta < matcher_config.search_progress_window.1
            {
                candidates.add_candidate(&key, &observation.callsign);
            }
        }
    }

    let (lower, upper) = matcher_config.search_time_progress_bounds;
    if !(time_progress > lower && time_progress < upper) {
        return None;
    }

    let all_candidates = candidates.candidates(&key);
    let failed = candidates.failed_candidates(&key);

    let first: HashSet<String> = all_candidates
        .difference(&failed)
        .filter(|c| !recent_bindings.contains(*c))
        .cloned()
        .collect();
    let second: HashSet<String> = all_candidates
        .iter()
        .filter(|c| !recent_bindings.contains(*c) && !first.contains(*c))
        .cloned()
        .collect();

    let first_confirmed = oracle_filter(oracle, &first, &flight.route).await;
    if first_confirmed.len() == 1 {
        bind_candidate(store, source_label, flight, &first_confirmed[0], tier::ORACLE_CONFIRMED_CANDIDATE, t);
        return None;
    }

    if first_confirmed.is_empty() {
        let second_confirmed = oracle_filter(oracle, &second, &flight.route).await;
        if second_confirmed.len() == 1 {
            bind_candidate(store, source_label, flight, &second_confirmed[0], tier::LOW_CONFIDENCE_CANDIDATE, t);
            return None;
        }
    }

    let mut first_set: Vec<String> = first.into_iter().collect();
    first_set.sort();
    let mut second_set: Vec<String> = second.into_iter().collect();
    second_set.sort();
    metrics::counter!("matcher.ambiguous_total").increment(1);
    Some(AmbiguousMatch {
        operator_iata: flight.operator_iata.clone(),
        flight_number: flight.flight_number,
        route: flight.route.to_string(),
        first_set,
        second_set,
    })
}

async fn oracle_filter(
    oracle: &dyn RouteOracle,
    callsigns: &HashSet<String>,
    route: &crate::route::Route,
) -> Vec<String> {
    let mut confirmed = Vec::new();
    for callsign in callsigns {
        if let Some(known_route) = oracle.get_flight_route(callsign).await {
            if &known_route == route {
                confirmed.push(callsign.clone());
            }
        }
    }
    confirmed
}

fn bind_candidate(
    store: &VerifiedRouteStore,
    source_label: &str,
    flight: &ScheduledFlight,
    callsign: &str,
    tier: u8,
    t: DateTime<Utc>,
) {
    store.put(
        VerifiedBinding {
            callsign: callsign.to_string(),
            route: flight.route.clone(),
            source: source_label.to_string(),
            operator_icao: flight.operator_icao.clone(),
            operator_iata: flight.operator_iata.clone(),
            flight_number: flight.flight_number,
            tier,
            error_count: 0,
            update_time: t,
            valid_from: t,
        },
        false,
    );
}
