//! Routing and geocoding backends.
//!
//! Two implementations:
//!
//! - [`mapbox`]: Mapbox Directions/Geocoding responses, with a blocking HTTP
//!   client behind the `mapbox` feature.
//! - [`gpx`]: offline routes loaded from GPX files.
//!
//! Providers report failure as `None`; the caller decides what the user sees.

pub mod gpx;
pub mod mapbox;

use crate::geo::Coordinate;
use crate::route::NavigationRoute;

/// Computes a route between two points.
pub trait RoutingProvider {
    /// Returns `None` on network error, no route found, or a malformed response.
    fn get_directions(&self, origin: Coordinate, destination: Coordinate) -> Option<NavigationRoute>;
}

/// Resolves free text to a coordinate, optionally biased toward a location.
pub trait GeocodingProvider {
    fn geocode_address(&self, text: &str, bias: Option<Coordinate>) -> Option<Coordinate>;
}
