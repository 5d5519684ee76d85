//! Verified-route store (C8): persists, ranks, and expires verified
//! (callsign, route) bindings.
//!
//! Implemented as a single `Mutex`-guarded in-process table, mirroring the
//! reference codebase's single-writer repository pattern, rather than a SQL
//! table — persistence to a durable backend is the outbound interface's
//! concern, not this component's.

use crate::route::Route;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// A persisted (callsign, route) binding (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedBinding {
    pub callsign: String,
    pub route: Route,
    pub source: String,
    pub operator_icao: String,
    pub operator_iata: String,
    pub flight_number: i64,
    pub tier: u8,
    pub error_count: u32,
    pub update_time: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    callsign: String,
    route: String,
}

fn key_for(callsign: &str, route: &Route) -> BindingKey {
    BindingKey {
        callsign: callsign.to_string(),
        route: route.to_string(),
    }
}

/// Error-count threshold above which a stale record is evicted regardless
/// of tier (§4.8).
pub const ERROR_COUNT_EVICTION_THRESHOLD: u32 = 10;

pub struct VerifiedRouteStore {
    bindings: Mutex<HashMap<BindingKey, VerifiedBinding>>,
    outdated_after: Duration,
}

impl VerifiedRouteStore {
    pub fn new(outdated_after: Duration) -> Self {
        Self {
            bindings: Mutex::new(HashMap::new()),
            outdated_after,
        }
    }

    /// Inserts or updates a binding, applying the §4.8 conflict-resolution
    /// policy against any existing record for the same (callsign, route).
    /// `reset_errors` forces the error counter to zero on acceptance,
    /// regardless of the previous value.
    pub fn put(&self, mut new: VerifiedBinding, reset_errors: bool) {
        let key = key_for(&new.callsign, &new.route);
        let mut bindings = self.bindings.lock().unwrap();

        let accept = match bindings.get(&key) {
            None => true,
            Some(old) => {
                if old.tier < new.tier {
                    true
                } else if self.is_outdated(old.update_time) {
                    true
                } else if old.error_count > ERROR_COUNT_EVICTION_THRESHOLD {
                    true
                } else if old.tier > new.tier {
                    false
                } else {
                    true
                }
            }
        };

        if !accept {
            return;
        }

        if let Some(old) = bindings.get(&key) {
            new.valid_from = if old.flight_number == new.flight_number
                && old.operator_iata == new.operator_iata
            {
                old.valid_from
            } else {
                new.update_time
            };
            if !reset_errors {
                new.error_count = old.error_count;
            } else {
                new.error_count = 0;
            }
        } else if reset_errors {
            new.error_count = 0;
        }

        bindings.insert(key, new);
    }

    fn is_outdated(&self, update_time: DateTime<Utc>) -> bool {
        Utc::now() - update_time > self.outdated_after
    }

    pub fn get(&self, callsign: &str, route: &Route) -> Option<VerifiedBinding> {
        let key = key_for(callsign, route);
        self.bindings.lock().unwrap().get(&key).cloned()
    }

    pub fn find_by_flight_number(
        &self,
        operator_iata: &str,
        flight_number: i64,
    ) -> Vec<VerifiedBinding> {
        self.bindings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.operator_iata == operator_iata && b.flight_number == flight_number)
            .cloned()
            .collect()
    }

    /// Distinct callsigns whose `tier >= min_tier` and whose `update_time`
    /// is within `hours` of now — the set C7 treats as "already known,
    /// don't search again".
    pub fn recent_callsigns(&self, min_tier: u8, hours: i64) -> std::collections::HashSet<String> {
        let cutoff = Utc::now() - Duration::hours(hours);
        self.bindings
            .lock()
            .unwrap()
            .values()
            .filter(|b| b.tier >= min_tier && b.update_time > cutoff)
            .map(|b| b.callsign.clone())
            .collect()
    }

    pub fn increase_error(&self, callsign: &str, route: &Route) {
        let key = key_for(callsign, route);
        if let Some(binding) = self.bindings.lock().unwrap().get_mut(&key) {
            binding.error_count += 1;
        }
    }

    pub fn reset_error(&self, callsign: &str, route: &Route) {
        let key = key_for(callsign, route);
        if let Some(binding) = self.bindings.lock().unwrap().get_mut(&key) {
            binding.error_count = 0;
        }
    }
}
