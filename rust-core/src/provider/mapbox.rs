//! Mapbox Directions and Geocoding.
//!
//! Response parsing is always available so a host that performs the HTTP
//! call itself (e.g. the Android app) can hand the raw JSON over. The
//! blocking HTTP client is behind the `mapbox` feature.

use serde::de::IgnoredAny;
use serde::Deserialize;

use crate::error::NavError;
use crate::geo::Coordinate;
use crate::route::{Maneuver, NavigationRoute, RouteStep, SpeedLimit, SpeedUnit};

const DEFAULT_INSTRUCTION: &str = "Follow route";

#[derive(Deserialize)]
struct DirectionsResponse {
    code: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Deserialize)]
struct ApiRoute {
    geometry: Option<LineString>,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Deserialize)]
struct LineString {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Deserialize)]
struct ApiLeg {
    steps: Option<Vec<ApiStep>>,
    annotation: Option<Annotation>,
}

#[derive(Deserialize)]
struct Annotation {
    #[serde(default)]
    maxspeed: Vec<MaxSpeed>,
}

/// Entries are either `{speed, unit}` or markers like `{unknown: true}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MaxSpeed {
    Known { speed: f64, unit: Option<String> },
    Other(IgnoredAny),
}

#[derive(Deserialize)]
struct ApiStep {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    maneuver: Option<ApiManeuver>,
    geometry: Option<LineString>,
}

#[derive(Deserialize)]
struct ApiManeuver {
    #[serde(rename = "type")]
    kind: Option<String>,
    modifier: Option<String>,
    location: Option<[f64; 2]>,
    instruction: Option<String>,
}

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    center: Vec<f64>,
}

/// Parse a Directions v5 response (requested with `steps=true`,
/// `geometries=geojson`, `annotations=maxspeed`) into a route.
///
/// Uses the first route and its first leg.
pub fn parse_directions(json: &str) -> Result<NavigationRoute, NavError> {
    let response: DirectionsResponse = serde_json::from_str(json)?;

    if let Some(code) = response.code.as_deref() {
        if code != "Ok" {
            log::warn!("Mapbox directions returned code {code}");
            return Err(NavError::RouteUnavailable);
        }
    }

    let route = response.routes.into_iter().next().ok_or(NavError::RouteUnavailable)?;
    let Some(leg) = route.legs.into_iter().next() else {
        log::warn!("route found but no legs returned");
        return Err(NavError::RouteUnavailable);
    };
    let Some(api_steps) = leg.steps else {
        log::warn!("route leg found but no steps returned");
        return Err(NavError::RouteUnavailable);
    };

    let maxspeeds = leg.annotation.map(|a| a.maxspeed).unwrap_or_default();
    let mut cursor = 0;

    let steps = api_steps
        .into_iter()
        .map(|step| {
            let point_count = step.geometry.as_ref().map_or(0, |g| g.coordinates.len());
            let speed_limit = step_speed_limit(&maxspeeds, cursor, point_count);
            if point_count > 0 && maxspeeds.len() > cursor {
                cursor += point_count - 1;
            }
            convert_step(step, speed_limit)
        })
        .collect();

    Ok(NavigationRoute {
        steps,
        distance: route.distance,
        duration: route.duration,
        geometry: route
            .geometry
            .map(|g| g.coordinates.into_iter().map(Coordinate::from_lng_lat).collect())
            .unwrap_or_default(),
    })
}

/// Parse a Geocoding v5 response; `None` when nothing matched.
pub fn parse_geocoding(json: &str) -> Result<Option<Coordinate>, NavError> {
    let response: GeocodingResponse = serde_json::from_str(json)?;
    Ok(response
        .features
        .first()
        .filter(|f| f.center.len() >= 2)
        .map(|f| Coordinate::new(f.center[1], f.center[0])))
}

// Annotations are per geometry segment across the whole leg; a step with
// n points spans n - 1 segments, so the cursor walks forward by that much.
fn step_speed_limit(maxspeeds: &[MaxSpeed], cursor: usize, point_count: usize) -> Option<SpeedLimit> {
    if point_count == 0 || maxspeeds.len() <= cursor {
        return None;
    }
    maxspeeds
        .iter()
        .skip(cursor)
        .take(point_count)
        .find_map(|entry| match entry {
            MaxSpeed::Known { speed, unit } => Some(SpeedLimit {
                value: *speed,
                unit: match unit.as_deref() {
                    Some("mph") => SpeedUnit::MilesPerHour,
                    _ => SpeedUnit::KilometersPerHour,
                },
            }),
            MaxSpeed::Other(_) => None,
        })
}

fn convert_step(step: ApiStep, speed_limit: Option<SpeedLimit>) -> RouteStep {
    let (instruction, maneuver) = match step.maneuver {
        Some(m) => (
            m.instruction,
            Maneuver {
                kind: m.kind.unwrap_or_else(|| "turn".to_string()),
                modifier: m.modifier,
                location: m.location.map(Coordinate::from_lng_lat),
            },
        ),
        None => (
            None,
            Maneuver {
                kind: "arrive".to_string(),
                modifier: None,
                location: None,
            },
        ),
    };

    RouteStep {
        instruction: instruction
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_INSTRUCTION.to_string()),
        maneuver,
        distance: step.distance,
        duration: step.duration,
        speed_limit,
    }
}

#[cfg(feature = "mapbox")]
pub use client::MapboxClient;

#[cfg(feature = "mapbox")]
mod client {
    use std::time::Duration;
    use reqwest::{blocking::Client, Url};

    use super::{parse_directions, parse_geocoding};
    use crate::config::MapboxConfig;
    use crate::error::NavError;
    use crate::geo::Coordinate;
    use crate::provider::{GeocodingProvider, RoutingProvider};
    use crate::route::NavigationRoute;

    /// Blocking HTTP client for the Mapbox APIs.
    #[derive(Debug, Clone)]
    pub struct MapboxClient {
        client: Client,
        config: MapboxConfig,
    }

    impl MapboxClient {
        pub fn new(config: MapboxConfig) -> Result<Self, NavError> {
            let client = Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .map_err(|e| NavError::Provider(format!("failed to build HTTP client: {e}")))?;
            Ok(Self { client, config })
        }

        /// Client with default endpoints and the token from `MAPBOX_ACCESS_TOKEN`.
        pub fn from_env() -> Result<Self, NavError> {
            Self::new(MapboxConfig::from_env())
        }

        fn base(&self) -> &str {
            self.config.base_url.trim_end_matches('/')
        }

        fn ensure_token(&self) -> Result<(), NavError> {
            if self.config.has_token() {
                Ok(())
            } else {
                Err(NavError::Config("Mapbox token missing".into()))
            }
        }

        pub fn fetch_directions(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<NavigationRoute, NavError> {
            self.ensure_token()?;
            let base = format!(
                "{}/directions/v5/mapbox/{}/{},{};{},{}",
                self.base(),
                self.config.profile,
                origin.lng,
                origin.lat,
                destination.lng,
                destination.lat
            );
            let mut url = Url::parse(&base)
                .map_err(|e| NavError::Provider(format!("failed to build directions URL: {e}")))?;
            url.query_pairs_mut()
                .append_pair("steps", "true")
                .append_pair("geometries", "geojson")
                .append_pair("annotations", "maxspeed")
                .append_pair("overview", "full")
                .append_pair("access_token", &self.config.access_token);

            let body = self.get(url)?;
            parse_directions(&body)
        }

        pub fn fetch_geocode(
            &self,
            text: &str,
            bias: Option<Coordinate>,
        ) -> Result<Option<Coordinate>, NavError> {
            self.ensure_token()?;
            let mut url = Url::parse(&format!("{}/geocoding/v5/mapbox.places", self.base()))
                .map_err(|e| NavError::Provider(format!("failed to build geocoding URL: {e}")))?;
            url.path_segments_mut()
                .map_err(|_| NavError::Provider("geocoding URL cannot be a base".into()))?
                .push(&format!("{text}.json"));
            url.query_pairs_mut()
                .append_pair("access_token", &self.config.access_token)
                .append_pair("limit", "1");
            if let Some(near) = bias {
                url.query_pairs_mut()
                    .append_pair("proximity", &format!("{},{}", near.lng, near.lat));
            }

            let body = self.get(url)?;
            parse_geocoding(&body)
        }

        fn get(&self, url: Url) -> Result<String, NavError> {
            self.client
                .get(url)
                .send()
                .and_then(|response| response.text())
                .map_err(|e| NavError::Provider(e.to_string()))
        }
    }

    impl RoutingProvider for MapboxClient {
        fn get_directions(&self, origin: Coordinate, destination: Coordinate) -> Option<NavigationRoute> {
            match self.fetch_directions(origin, destination) {
                Ok(route) => Some(route),
                Err(e) => {
                    log::error!("Mapbox directions failed: {e}");
                    None
                }
            }
        }
    }

    impl GeocodingProvider for MapboxClient {
        fn geocode_address(&self, text: &str, bias: Option<Coordinate>) -> Option<Coordinate> {
            self.fetch_geocode(text, bias).unwrap_or_else(|e| {
                log::error!("Mapbox geocoding failed: {e}");
                None
            })
        }
    }
}
