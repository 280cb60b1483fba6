//! Geographic primitives.
//!
//! Platform-agnostic distance and bearing computations. All coordinates
//! use WGS84 (lat/lng in degrees). Inputs are not validated: out-of-range
//! or non-finite values flow through the formulas and typically yield NaN.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a GeoJSON-ordered `[lng, lat]` pair.
    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lng: pair[0],
        }
    }

    /// Great-circle distance to `other` in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine(self, other)
    }
}

/// Haversine distance between two coordinates in meters.
///
/// The intermediate term is clamped to `[0, 1]` so rounding can neither
/// push identical points below zero nor antipodal points past `asin`'s domain.
pub fn haversine(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.clamp(0.0, 1.0).sqrt().asin()
}

/// Initial bearing from `a` to `b` in degrees [0, 360).
pub fn bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Total length of a polyline in meters.
pub fn path_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine(&w[0], &w[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng)
    }

    #[test]
    fn haversine_same_point_is_zero() {
        for p in [pt(48.2082, 16.3738), pt(0.0, 0.0), pt(-89.9, 179.9), pt(37.7749, -122.4194)] {
            let d = haversine(&p, &p);
            assert!(d >= 0.0 && d < 1e-6, "Expected 0, got {d}");
        }
    }

    #[test]
    fn haversine_is_symmetric() {
        let pairs = [
            (pt(48.2082, 16.3738), pt(48.1486, 17.1077)),
            (pt(37.7749, -122.4194), pt(34.0522, -118.2437)),
            (pt(-33.8688, 151.2093), pt(51.5074, -0.1278)),
        ];
        for (a, b) in pairs {
            assert_eq!(haversine(&a, &b), haversine(&b, &a));
        }
    }

    #[test]
    fn haversine_known_distance() {
        // Vienna to Bratislava ~55 km
        let dist = haversine(&pt(48.2082, 16.3738), &pt(48.1486, 17.1077));
        assert!(dist > 50_000.0 && dist < 60_000.0,
            "Expected ~55 km, got {:.0} m", dist);
    }

    #[test]
    fn haversine_tiny_distance_is_positive() {
        let d = haversine(&pt(37.7749, -122.4194), &pt(37.7749, -122.41940001));
        assert!(d > 0.0 && d < 0.01, "got {d}");
    }

    #[test]
    fn haversine_antipodal_is_half_circumference() {
        let d = haversine(&pt(0.0, 0.0), &pt(0.0, 180.0));
        let half = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!(!d.is_nan());
        assert!((d - half).abs() < 1.0, "got {d}");
    }

    #[test]
    fn haversine_nan_propagates() {
        assert!(haversine(&pt(f64::NAN, 0.0), &pt(0.0, 0.0)).is_nan());
    }

    #[test]
    fn bearing_cardinal_directions() {
        let b = bearing(&pt(0.0, 0.0), &pt(0.0, 1.0));
        assert!((b - 90.0).abs() < 0.1, "Expected ~90, got {b}");
        let b = bearing(&pt(0.0, 0.0), &pt(1.0, 0.0));
        assert!(b.abs() < 0.1, "Expected ~0, got {b}");
    }

    #[test]
    fn path_length_simple() {
        let len = path_length(&[pt(0.0, 0.0), pt(0.0, 1.0), pt(0.0, 2.0)]);
        // Each degree of longitude at equator ~111 km
        assert!(len > 200_000.0 && len < 230_000.0,
            "Expected ~222 km, got {:.0} m", len);
    }

    #[test]
    fn lng_lat_pair_order() {
        let c = Coordinate::from_lng_lat([-122.4194, 37.7749]);
        assert_eq!(c.lat, 37.7749);
        assert_eq!(c.lng, -122.4194);
    }
}
