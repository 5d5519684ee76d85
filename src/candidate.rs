//! Cross-cycle candidate sets (§3 CandidateSet, §9 design note): per
//! scheduled-flight key, two disjoint TTL sets of candidate callsigns.
//!
//! A dedicated in-process structure with (last-touch time, set) tuples plus
//! a periodic sweep, rather than a generic TTL cache crate — the "don't
//! extend TTL on read, only on write" semantics this needs don't match a
//! vanilla time-to-idle cache.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const CANDIDATE_TTL_HOURS: i64 = 24;

struct Entry {
    callsigns: HashSet<String>,
    last_touch: DateTime<Utc>,
}

impl Entry {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            callsigns: HashSet::new(),
            last_touch: now,
        }
    }
}

/// Holds the `candidates:<key>` and `failed_candidates:<key>` TTL sets
/// described in §3 and §6.
pub struct CandidateStore {
    candidates: Mutex<HashMap<String, Entry>>,
    failed_candidates: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(CANDIDATE_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            candidates: Mutex::new(HashMap::new()),
            failed_candidates: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn add_candidate(&self, key: &str, callsign: &str) {
        Self::add(&self.candidates, key, callsign);
    }

    pub fn add_failed_candidate(&self, key: &str, callsign: &str) {
        Self::add(&self.failed_candidates, key, callsign);
    }

    fn add(map: &Mutex<HashMap<String, Entry>>, key: &str, callsign: &str) {
        let now = Utc::now();
        let mut map = map.lock().unwrap();
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| Entry::fresh(now));
        entry.callsigns.insert(callsign.to_string());
        entry.last_touch = now;
    }

    /// Candidates for `key` not yet expired, empty if the key is absent or
    /// expired.
    pub fn candidates(&self, key: &str) -> HashSet<String> {
        Self::get(&self.candidates, self.ttl, key)
    }

    pub fn failed_candidates(&self, key: &str) -> HashSet<String> {
        Self::get(&self.failed_candidates, self.ttl, key)
    }

    fn get(map: &Mutex<HashMap<String, Entry>>, ttl: Duration, key: &str) -> HashSet<String> {
        let now = Utc::now();
        let map = map.lock().unwrap();
        match map.get(key) {
            Some(entry) if now - entry.last_touch <= ttl => entry.callsigns.clone(),
            _ => HashSet::new(),
        }
    }

    /// Drops every entry (in both sets) whose TTL has elapsed. Intended to
    /// be called periodically by the matcher worker between cycles.
    pub fn sweep(&self) {
        let now = Utc::now();
        let ttl = self.ttl;
        self.candidates
            .lock()
            .unwrap()
            .retain(|_, entry| now - entry.last_touch <= ttl);
        self.failed_candidates
            .lock()
            .unwrap()
            .retain(|_, entry| now - entry.last_touch <= ttl);
    }
}

impl Default for CandidateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the `IATA_FN_Route` key used for candidate-set lookups (§6).
pub fn candidate_key(operator_iata: &str, flight_number: i64, route: &crate::route::Route) -> String {
    format!("{operator_iata}_{flight_number}_{route}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_is_visible_immediately_after_add() {
        let store = CandidateStore::new();
        store.add_candidate("LH_400_EDDF-EGLL", "DLH400");
        assert!(store.candidates("LH_400_EDDF-EGLL").contains("DLH400"));
    }

    #[test]
    fn candidate_and_failed_candidate_sets_are_disjoint_stores() {
        let store = CandidateStore::new();
        store.add_candidate("k", "DLH400");
        store.add_failed_candidate("k", "DLH401");
        assert!(store.candidates("k").contains("DLH400"));
        assert!(!store.candidates("k").contains("DLH401"));
        assert!(store.failed_candidates("k").contains("DLH401"));
    }

    #[test]
    fn expired_entry_is_treated_as_absent() {
        let store = CandidateStore::with_ttl(Duration::seconds(-1));
        store.add_candidate("k", "DLH400");
        assert!(store.candidates("k").is_empty());
    }

    #[test]
    fn sweep_removes_expired_entries() {
        let store = CandidateStore::with_ttl(Duration::seconds(-1));
        store.add_candidate("k", "DLH400");
        store.sweep();
        assert!(store.candidates("k").is_empty());
    }

    #[test]
    fn candidate_key_formats_iata_flight_number_and_route() {
        let route = crate::route::Route::parse("EDDF-EGLL").unwrap();
        assert_eq!(candidate_key("LH", 400, &route), "LH_400_EDDF-EGLL");
    }
}
