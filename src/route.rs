//! Route type (§3) and the geometric route-check engine (C5).

use crate::geodesy::{self, LatLon};
use crate::observation::Observation;
use crate::reference::ReferenceDirectory;

/// An ordered sequence of airport codes, rendered as `-`-joined segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    codes: Vec<String>,
}

impl Route {
    /// Parses a `-`-joined route string. Does not validate that the codes
    /// resolve in any reference directory; call `is_valid` for that.
    pub fn parse(route: &str) -> Option<Self> {
        let codes: Vec<String> = route.split('-').map(|s| s.to_uppercase()).collect();
        if codes.len() < 2 || codes.iter().any(|c| c.is_empty()) {
            return None;
        }
        Some(Self { codes })
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn leg_count(&self) -> usize {
        self.codes.len().saturating_sub(1)
    }

    /// Adjacent-pair legs of this route, as `(a, b)` code slices.
    pub fn legs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes.windows(2).map(|w| (w[0].as_str(), w[1].as_str()))
    }

    pub fn is_valid(&self, reference: &ReferenceDirectory) -> bool {
        self.leg_count() >= 1 && self.codes.iter().all(|c| reference.airport(c).is_some())
    }

    /// Total geodesic length of the route in metres, summing each leg.
    /// Returns `None` if any code doesn't resolve in `reference`.
    pub fn total_length_m(&self, reference: &ReferenceDirectory) -> Option<f64> {
        let mut total = 0.0;
        for (a, b) in self.legs() {
            let airport_a = reference.airport(a)?;
            let airport_b = reference.airport(b)?;
            total += geodesy::leg_length(
                LatLon::new(airport_a.latitude, airport_a.longitude),
                LatLon::new(airport_b.latitude, airport_b.longitude),
            );
        }
        Some(total)
    }

    /// Renders the route using IATA codes where the reference directory
    /// knows one, falling back to the original code otherwise.
    pub fn to_iata(&self, reference: &ReferenceDirectory) -> String {
        self.codes
            .iter()
            .map(|code| {
                reference
                    .airport(code)
                    .and_then(|a| a.iata.clone())
                    .unwrap_or_else(|| code.clone())
            })
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.codes.join("-"))
    }
}

/// Tunable constants for the failure rules in `check_leg`. Defaults match
/// §6 of the specification.
#[derive(Debug, Clone, Copy)]
pub struct RouteCheckConfig {
    pub on_ground_distance_cap_m: f64,
    pub deviation_cap_m: f64,
    pub deviation_cap_ratio: f64,
    pub deviation_ratio_cap: f64,
    pub heading_rule_a_progress: (f64, f64),
    pub heading_rule_a_do_m: f64,
    pub heading_rule_a_dd_m: f64,
    pub heading_rule_a_error_deg: f64,
    pub heading_rule_b_progress: (f64, f64),
    pub heading_rule_b_do_m: f64,
    pub heading_rule_b_dd_m: f64,
    pub heading_rule_b_error_deg: f64,
    pub descent_too_early_progress: f64,
    pub descent_too_early_vrate_ms: f64,
    pub climb_too_late_progress: f64,
    pub climb_too_late_vrate_ms: f64,
}

impl Default for RouteCheckConfig {
    fn default() -> Self {
        Self {
            on_ground_distance_cap_m: 5_000.0,
            deviation_cap_m: 265_000.0,
            deviation_cap_ratio: 0.15,
            deviation_ratio_cap: 0.6,
            heading_rule_a_progress: (0.12, 0.85),
            heading_rule_a_do_m: 81_500.0,
            heading_rule_a_dd_m: 77_000.0,
            heading_rule_a_error_deg: 61.5,
            heading_rule_b_progress: (0.10, 0.85),
            heading_rule_b_do_m: 25_000.0,
            heading_rule_b_dd_m: 41_000.0,
            heading_rule_b_error_deg: 126.0,
            descent_too_early_progress: 0.20,
            descent_too_early_vrate_ms: -5.0,
            climb_too_late_progress: 0.80,
            climb_too_late_vrate_ms: 5.5,
        }
    }
}

/// Result of checking a position against a single leg.
#[derive(Debug, Clone)]
pub struct LegCheck {
    pub route: Route,
    pub leg_index: usize,
    pub leg_length_m: f64,
    pub deviation_m: f64,
    pub deviation_ratio: f64,
    pub progress: f64,
    pub error_angle_deg: f64,
    pub dist_from_origin_m: f64,
    pub dist_to_destination_m: f64,
    pub check_failed: bool,
}

/// Evaluates a single leg `a -> b` against an observation. Returns `None`
/// if either airport is unknown, the leg is degenerate (`a == b`), or the
/// observation lacks coordinates (always present on a validated
/// `Observation`, so this only guards construction mistakes).
pub fn check_leg(
    reference: &ReferenceDirectory,
    config: &RouteCheckConfig,
    observation: &Observation,
    route: &Route,
    leg_index: usize,
    a: &str,
    b: &str,
) -> Option<LegCheck> {
    if a.eq_ignore_ascii_case(b) {
        return None;
    }
    let airport_a = reference.airport(a)?;
    let airport_b = reference.airport(b)?;

    let a_pos = LatLon::new(airport_a.latitude, airport_a.longitude);
    let b_pos = LatLon::new(airport_b.latitude, airport_b.longitude);
    let obs_pos = LatLon::new(observation.latitude, observation.longitude);

    let leg_length_m = geodesy::leg_length(a_pos, b_pos);
    let dist_from_origin_m = geodesy::leg_length(a_pos, obs_pos);
    let to_destination = geodesy::distance_and_bearings(obs_pos, b_pos);
    let dist_to_destination_m = to_destination.distance_m;

    let deviation_m = dist_from_origin_m + dist_to_destination_m - leg_length_m;
    let deviation_ratio = if leg_length_m > 0.0 {
        deviation_m / leg_length_m
    } else {
        0.0
    };
    let progress = if dist_from_origin_m + dist_to_destination_m > 0.0 {
        dist_from_origin_m / (dist_from_origin_m + dist_to_destination_m)
    } else {
        0.0
    };
    let error_angle_deg = angular_difference(observation.heading_deg, to_destination.initial_bearing_deg);

    let mut check_failed = false;

    if observation.on_ground && dist_from_origin_m > config.on_ground_distance_cap_m
        && dist_to_destination_m > config.on_ground_distance_cap_m
    {
        check_failed = true;
    } else if deviation_m > config.deviation_cap_m && deviation_ratio > config.deviation_cap_ratio {
        check_failed = true;
    } else if deviation_ratio > config.deviation_ratio_cap {
        check_failed = true;
    } else if progress > config.heading_rule_a_progress.0
        && progress < config.heading_rule_a_progress.1
        && dist_from_origin_m > config.heading_rule_a_do_m
        && dist_to_destination_m > config.heading_rule_a_dd_m
        && error_angle_deg > config.heading_rule_a_error_deg
    {
        check_failed = true;
    } else if progress > config.heading_rule_b_progress.0
        && progress < config.heading_rule_b_progress.1
        && dist_from_origin_m > config.heading_rule_b_do_m
        && dist_to_destination_m > config.heading_rule_b_dd_m
        && error_angle_deg > config.heading_rule_b_error_deg
    {
        check_failed = true;
    } else if progress < config.descent_too_early_progress
        && observation.vertical_rate_ms < config.descent_too_early_vrate_ms
    {
        check_failed = true;
    } else if progress > config.climb_too_late_progress
        && observation.vertical_rate_ms > config.climb_too_late_vrate_ms
    {
        check_failed = true;
    }

    Some(LegCheck {
        route: route.clone(),
        leg_index,
        leg_length_m,
        deviation_m,
        deviation_ratio,
        progress,
        error_angle_deg,
        dist_from_origin_m,
        dist_to_destination_m,
        check_failed,
    })
}

fn angular_difference(heading_deg: f64, bearing_deg: f64) -> f64 {
    (((heading_deg - bearing_deg) + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Evaluates a multi-leg route and selects the single leg the observation is
/// most plausibly flying. Returns `None` if the route is degenerate (fewer
/// than two codes, or a trivial A-A route) or if any leg's airports don't
/// resolve in the reference directory.
pub fn check_route(
    reference: &ReferenceDirectory,
    config: &RouteCheckConfig,
    observation: &Observation,
    route: &Route,
) -> Option<LegCheck> {
    if route.leg_count() < 1 {
        return None;
    }
    if route.codes().len() == 2 && route.codes()[0].eq_ignore_ascii_case(&route.codes()[1]) {
        return None;
    }

    let mut leg_results = Vec::with_capacity(route.leg_count());
    for (i, (a, b)) in route.legs().enumerate() {
        let result = check_leg(reference, config, observation, route, i, a, b)?;
        leg_results.push(result);
    }

    let ok_legs: Vec<&LegCheck> = leg_results.iter().filter(|l| !l.check_failed).collect();
    if ok_legs.len() == 1 {
        return Some(ok_legs[0].clone());
    }

    let min_deviation = leg_results
        .iter()
        .min_by(|a, b| a.deviation_m.partial_cmp(&b.deviation_m).unwrap())
        .unwrap();
    if !min_deviation.check_failed {
        return Some(min_deviation.clone());
    }

    let min_error_angle = leg_results
        .iter()
        .min_by(|a, b| a.error_angle_deg.partial_cmp(&b.error_angle_deg).unwrap())
        .unwrap();
    Some(min_error_angle.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{AirportRef, ReferenceDirectory};
    use chrono::Utc;

    fn directory() -> ReferenceDirectory {
        let airports = vec![
            AirportRef {
                icao: "EDDF".into(),
                iata: Some("FRA".into()),
                name: "Frankfurt".into(),
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

    fn base_observation(lat: f64, lon: f64, heading: f64, on_ground: bool, vrate: f64) -> Observation {
        Observation {
            callsign: "DLH400".into(),
            operator_icao: "DLH".into(),
            aircraft_hardware_id: "3C1234".into(),
            latitude: lat,
            longitude: lon,
            altitude_m: 10_000.0,
            flight_level: 328,
            heading_deg: heading,
            vertical_rate_ms: vrate,
            ground_speed_ms: 230.0,
            on_ground,
            observed_at: Utc::now(),
            numeric_suffix: Some(400),
            registration: None,
        }
    }

    #[test]
    fn s4_on_ground_at_origin_succeeds() {
        let dir = directory();
        let route = Route::parse("EDDF-EGLL").unwrap();
        let obs = base_observation(50.0333, 8.5706, 280.0, true, 0.0);
        let result = check_route(&dir, &RouteCheckConfig::default(), &obs, &route).unwrap();
        assert!(!result.check_failed);
        assert!(result.dist_from_origin_m < 5_000.0);
    }

    #[test]
    fn s5_cross_track_deviation_within_tolerance_succeeds() {
        let dir = directory();
        let route = Route::parse("EDDF-EGLL").unwrap();
        // Roughly midpoint, offset ~300km north, heading broadly toward EGLL.
        let obs = base_observation(53.3, 4.0, 270.0, false, 0.0);
        let result = check_route(&dir, &RouteCheckConfig::default(), &obs, &route).unwrap();
        assert!(result.deviation_ratio < 0.6);
    }

    #[test]
    fn s6_wrong_direction_mid_flight_fails_heading_rule() {
        let dir = directory();
        let route = Route::parse("EDDF-EGLL").unwrap();
        // Midpoint of the route, heading pointed away from the destination.
        let obs = base_observation(50.76, 4.05, 90.0, false, 0.0);
        let result = check_route(&dir, &RouteCheckConfig::default(), &obs, &route).unwrap();
        assert!(result.check_failed);
    }

    #[test]
    fn p2_progress_and_deviation_bounds_hold_on_success() {
        let dir = directory();
        let route = Route::parse("EDDF-EGLL").unwrap();
        let obs = base_observation(50.0333, 8.5706, 280.0, true, 0.0);
        let result = check_route(&dir, &RouteCheckConfig::default(), &obs, &route).unwrap();
        assert!(result.progress >= 0.0 && result.progress <= 1.0);
        assert!(result.deviation_m >= -1e-6);
    }

    #[test]
    fn total_length_m_sums_legs_and_rejects_unknown_airport() {
        let dir = directory();
        let route = Route::parse("EDDF-EGLL").unwrap();
        let total = route.total_length_m(&dir).unwrap();
        assert!((total - 654_000.0).abs() < 10_000.0);

        let bad_route = Route::parse("EDDF-ZZZZ").unwrap();
        assert!(bad_route.total_length_m(&dir).is_none());
    }

    #[test]
    fn unknown_airport_returns_none() {
        let dir = directory();
        let route = Route::parse("EDDF-ZZZZ").unwrap();
        let obs = base_observation(50.0333, 8.5706, 280.0, true, 0.0);
        assert!(check_route(&dir, &RouteCheckConfig::default(), &obs, &route).is_none());
    }

    #[test]
    fn trivial_a_a_route_returns_none() {
        let dir = directory();
        let route = Route::parse("EDDF-EDDF").unwrap();
        let obs = base_observation(50.0333, 8.5706, 280.0, true, 0.0);
        assert!(check_route(&dir, &RouteCheckConfig::default(), &obs, &route).is_none());
    }

    #[test]
    fn s7_multi_leg_route_selects_nearest_unfailed_leg() {
        let airports = vec![
            AirportRef {
                icao: "AAAA".into(),
                iata: None,
                name: "A".into(),
                latitude: 0.0,
                longitude: 0.0,
                country: "XX".into(),
                timezone: "UTC".into(),
            },
            AirportRef {
                icao: "BBBB".into(),
                iata: None,
                name: "B".into(),
                latitude: 0.0,
                longitude: 3.6,
                country: "XX".into(),
                timezone: "UTC".into(),
            },
            AirportRef {
                icao: "CCCC".into(),
                iata: None,
                name: "C".into(),
                latitude: 0.0,
                longitude: 7.2,
                country: "XX".into(),
                timezone: "UTC".into(),
            },
        ];
        let dir = ReferenceDirectory::new(airports, vec![]);
        let route = Route::parse("AAAA-BBBB-CCCC").unwrap();
        // Just past B, heading toward C.
        let obs = base_observation(0.0, 3.8, 90.0, false, 0.0);
        let result = check_route(&dir, &RouteCheckConfig::default(), &obs, &route).unwrap();
        assert_eq!(result.leg_index, 1);
        assert!(result.progress < 0.3);
    }

    #[test]
    fn r2_palindrome_route_is_symmetric() {
        let dir = directory();
        let forward = Route::parse("EDDF-EGLL-EDDF").unwrap();
        let obs = base_observation(50.76, 4.05, 270.0, false, 0.0);
        let result = check_route(&dir, &RouteCheckConfig::default(), &obs, &forward).unwrap();
        assert!(result.progress >= 0.0 && result.progress <= 1.0);
    }

}
