//! External collaborator interfaces (§6, §9): source adapters, the
//! translation table, and the route oracle. Concrete adapters (airport
//! scrapers, agency feeds) are out of scope; this module defines the
//! capability set the matcher is parametric over, plus a minimal in-memory
//! demo implementation of each for the binary entry point and tests.

use crate::route::Route;
use crate::schedule::ScheduledFlight;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// A pluggable schedule/status feed (§9: "polymorphic source adapters").
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable label identifying this source in logs and verified bindings.
    fn source_label(&self) -> &str;

    /// Scheduled flights this source currently believes satisfy C6 at `t`.
    async fn get_active_flights(&self, t: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledFlight>>;

    /// Scheduled flights whose departure or arrival falls within `date`
    /// (UTC calendar day).
    async fn get_flights_of_day(&self, date: NaiveDate) -> anyhow::Result<Vec<ScheduledFlight>>;

    /// Distinct operator ICAOs this source covers.
    fn get_supported_airlines(&self) -> Vec<String>;
}

/// An externally maintained manual override map from assumed callsign to
/// actually-flown callsign (§6).
pub trait TranslationTable: Send + Sync {
    fn get(&self, assumed_callsign: &str) -> Option<String>;
}

/// Queried in matcher step 5: does any long-term historical source confirm
/// this callsign has flown this route?
#[async_trait]
pub trait RouteOracle: Send + Sync {
    async fn get_flight_route(&self, callsign: &str) -> Option<Route>;
}

/// An in-memory `SourceAdapter` backed by a fixed flight list, useful for
/// the demo binary and for tests exercising the matcher against a
/// `SourceAdapter` trait object rather than a concrete type.
pub struct StaticSourceAdapter {
    label: String,
    flights: RwLock<Vec<ScheduledFlight>>,
}

impl StaticSourceAdapter {
    pub fn new(label: impl Into<String>, flights: Vec<ScheduledFlight>) -> Self {
        Self {
            label: label.into(),
            flights: RwLock::new(flights),
        }
    }

    pub fn replace_flights(&self, flights: Vec<ScheduledFlight>) {
        *self.flights.write().unwrap() = flights;
    }
}

#[async_trait]
impl SourceAdapter for StaticSourceAdapter {
    fn source_label(&self) -> &str {
        &self.label
    }

    async fn get_active_flights(&self, t: DateTime<Utc>) -> anyhow::Result<Vec<ScheduledFlight>> {
        let flights = self.flights.read().unwrap();
        Ok(flights
            .iter()
            .filter(|f| {
                f.is_valid()
                    && !f.cancelled
                    && crate::schedule::passes_pre_filter(f, t)
            })
            .cloned()
            .collect())
    }

    async fn get_flights_of_day(&self, date: NaiveDate) -> anyhow::Result<Vec<ScheduledFlight>> {
        let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::days(1);
        let flights = self.flights.read().unwrap();
        Ok(flights
            .iter()
            .filter(|f| {
                let departure_in_day = f.departure.is_some_and(|d| d >= start && d < end);
                let arrival_in_day = f.arrival.is_some_and(|a| a >= start && a < end);
                departure_in_day || arrival_in_day
            })
            .cloned()
            .collect())
    }

    fn get_supported_airlines(&self) -> Vec<String> {
        let flights = self.flights.read().unwrap();
        let mut airlines: Vec<String> = flights
            .iter()
            .map(|f| f.operator_icao.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        airlines.sort();
        airlines
    }
}

/// A fixed in-memory translation table, for tests and the demo binary.
/// Production deployments would back this with an operator-maintained
/// file or service, which is out of scope.
#[derive(Debug, Clone, Default)]
pub struct StaticTranslationTable {
    overrides: HashMap<String, String>,
}

impl StaticTranslationTable {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }
}

impl TranslationTable for StaticTranslationTable {
    fn get(&self, assumed_callsign: &str) -> Option<String> {
        self.overrides.get(assumed_callsign).cloned()
    }
}

/// A route oracle backed by a fixed in-memory map, for tests and the demo
/// binary. Production deployments would query one or more historical route
/// providers, which is out of scope.
#[derive(Debug, Clone, Default)]
pub struct StaticRouteOracle {
    known_routes: HashMap<String, Route>,
}

impl StaticRouteOracle {
    pub fn new(known_routes: HashMap<String, Route>) -> Self {
        Self { known_routes }
    }
}

#[async_trait]
impl RouteOracle for StaticRouteOracle {
    async fn get_flight_route(&self, callsign: &str) -> Option<Route> {
        self.known_routes.get(callsign).cloned()
    }
}
