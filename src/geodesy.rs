//! Great-circle distance and bearing calculations on the WGS84 ellipsoid.
//!
//! `leg_length` and `distance_and_bearings` are the only entry points the rest
//! of the crate uses; everything else here is Vincenty's iterative inverse
//! formula plus the non-iterative fallback used when it fails to converge
//! (which happens for near-antipodal point pairs).

use geo::{Geodesic, Distance};
use geo::Point as GeoPoint;
use tracing::warn;

/// A point on the earth's surface, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

// WGS84 ellipsoid constants.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);

const VINCENTY_MAX_ITERATIONS: usize = 200;
const VINCENTY_CONVERGENCE_EPS: f64 = 1e-12;

/// Distance in metres plus the initial and final bearing in degrees [0, 360).
#[derive(Debug, Clone, Copy)]
pub struct DistanceAndBearings {
    pub distance_m: f64,
    pub initial_bearing_deg: f64,
    pub final_bearing_deg: f64,
}

/// Geodesic distance and bearings between two distinct points.
///
/// Undefined for identical points (division by zero in the bearing
/// computation) — callers must guard against `from == to` themselves, per
/// the route-check engine's own A-A guard.
pub fn distance_and_bearings(from: LatLon, to: LatLon) -> DistanceAndBearings {
    match vincenty_inverse(from, to) {
        Some(result) => result,
        None => {
            warn!(
                from.lat = from.lat,
                from.lon = from.lon,
                to.lat = to.lat,
                to.lon = to.lon,
                "Vincenty inverse formula failed to converge, falling back to Karney's algorithm"
            );
            metrics::counter!("geodesy.vincenty_fallback_total").increment(1);
            karney_fallback(from, to)
        }
    }
}

/// Geodesic distance between two points, in metres.
pub fn leg_length(from: LatLon, to: LatLon) -> f64 {
    distance_and_bearings(from, to).distance_m
}

/// Vincenty's iterative inverse formula. Returns `None` on non-convergence,
/// which occurs for some near-antipodal point pairs.
fn vincenty_inverse(from: LatLon, to: LatLon) -> Option<DistanceAndBearings> {
    let l = (to.lon - from.lon).to_radians();
    let u1 = ((1.0 - WGS84_F) * from.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * to.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut iter_limit = VINCENTY_MAX_ITERATIONS;
    let (
        mut sin_sigma,
        mut cos_sigma,
        mut sigma,
        mut cos_sq_alpha,
        mut cos_2sigma_m,
        mut sin_lambda,
        mut cos_lambda,
    ) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    loop {
        sin_lambda = lambda.sin();
        cos_lambda = lambda.cos();
        let sin_sq_sigma = (cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2);
        sin_sigma = sin_sq_sigma.sqrt();
        if sin_sigma == 0.0 {
            // Coincident points; distance is zero and bearings are undefined,
            // but we report zero rather than panicking.
            return Some(DistanceAndBearings {
                distance_m: 0.0,
                initial_bearing_deg: 0.0,
                final_bearing_deg: 0.0,
            });
        }
        cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        cos_sq_alpha = 1.0 - sin_alpha.powi(2);
        cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            // Equatorial line.
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));
        iter_limit -= 1;
        if (lambda - lambda_prev).abs() <= VINCENTY_CONVERGENCE_EPS {
            break;
        }
        if iter_limit == 0 {
            return None;
        }
    }

    let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
    let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    let delta_sigma = big_b
        * sin_sigma
        * (cos_2sigma_m
            + big_b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                    - big_b / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma.powi(2))
                        * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
    let distance_m = WGS84_B * big_a * (sigma - delta_sigma);

    let initial_bearing = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
    let final_bearing = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

    Some(DistanceAndBearings {
        distance_m,
        initial_bearing_deg: normalize_bearing(initial_bearing.to_degrees()),
        final_bearing_deg: normalize_bearing(final_bearing.to_degrees()),
    })
}

/// Non-iterative ellipsoidal fallback (Karney's algorithm, via the `geo`
/// crate) used when Vincenty's inverse formula fails to converge.
fn karney_fallback(from: LatLon, to: LatLon) -> DistanceAndBearings {
    let a = GeoPoint::new(from.lon, from.lat);
    let b = GeoPoint::new(to.lon, to.lat);
    let distance_m = Geodesic.distance(a, b);
    // geo's Geodesic distance implementation does not expose bearings
    // directly; derive them from the same ellipsoidal solution via a
    // spherical approximation, which is accurate to a fraction of a degree
    // at the distances this crate deals with and only used in the rare
    // non-convergent case.
    let initial_bearing_deg = spherical_bearing(from, to);
    let final_bearing_deg = normalize_bearing(spherical_bearing(to, from) + 180.0);
    DistanceAndBearings {
        distance_m,
        initial_bearing_deg,
        final_bearing_deg,
    }
}

fn spherical_bearing(from: LatLon, to: LatLon) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();
    let y = delta_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    normalize_bearing(y.atan2(x).to_degrees())
}

fn normalize_bearing(deg: f64) -> f64 {
    ((deg % 360.0) + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frankfurt_to_heathrow_distance_matches_known_value() {
        // EDDF and EGLL, published great-circle distance ~ 654 km.
        let eddf = LatLon::new(50.0333, 8.5706);
        let egll = LatLon::new(51.4706, -0.4619);
        let d = leg_length(eddf, egll);
        assert!(
            (d - 654_000.0).abs() < 10_000.0,
            "expected ~654km, got {d}"
        );
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLon::new(48.3538, 11.7861); // EDDM
        let b = LatLon::new(52.5588, 13.2884); // EDDB
        let fwd = leg_length(a, b);
        let rev = leg_length(b, a);
        assert!((fwd - rev).abs() < 1.0);
    }

    #[test]
    fn bearings_are_normalized_degrees() {
        let a = LatLon::new(50.0333, 8.5706);
        let b = LatLon::new(51.4706, -0.4619);
        let result = distance_and_bearings(a, b);
        assert!((0.0..360.0).contains(&result.initial_bearing_deg));
        assert!((0.0..360.0).contains(&result.final_bearing_deg));
    }

    #[test]
    fn coincident_points_have_zero_distance() {
        let a = LatLon::new(50.0333, 8.5706);
        let result = distance_and_bearings(a, a);
        assert_eq!(result.distance_m, 0.0);
    }

}
