//! Tunable thresholds and provider settings.
//!
//! Every struct deserializes from JSON with all fields optional, so a
//! host can override a single value and inherit the rest.

use serde::{Deserialize, Serialize};
use crate::error::NavError;

/// Thresholds used by the progress tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Radius around a maneuver within which the step counts as reached.
    pub arrival_threshold_m: f64,
    /// "Arriving shortly" fires only below this remaining time.
    pub near_destination_max_time_s: f64,
    /// ...and strictly between these remaining distances.
    pub near_destination_min_distance_m: f64,
    pub near_destination_max_distance_m: f64,
    /// Limit assumed by the speeding indicator when a step carries none.
    pub fallback_speed_limit_kmh: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            arrival_threshold_m: 40.0,
            near_destination_max_time_s: 180.0,
            near_destination_min_distance_m: 50.0,
            near_destination_max_distance_m: 2000.0,
            fallback_speed_limit_kmh: 120.0,
        }
    }
}

impl NavigationConfig {
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NavError> {
        if !(self.arrival_threshold_m > 0.0) {
            return Err(NavError::Config("arrival_threshold_m must be positive".into()));
        }
        if self.near_destination_min_distance_m >= self.near_destination_max_distance_m {
            return Err(NavError::Config(
                "near_destination_min_distance_m must be below the max".into(),
            ));
        }
        Ok(())
    }
}

/// Mapbox API access settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapboxConfig {
    pub access_token: String,
    pub base_url: String,
    /// Directions profile, e.g. "driving", "walking".
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            base_url: "https://api.mapbox.com".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

impl MapboxConfig {
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults with the token taken from `MAPBOX_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        Self {
            access_token: std::env::var("MAPBOX_ACCESS_TOKEN").unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn has_token(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

/// Settings for the offline GPX-backed routing provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpxProviderConfig {
    /// A saved route matches when its end lies this close to the destination.
    pub destination_match_radius_m: f64,
    /// Ramer-Douglas-Peucker tolerance for turning tracks into maneuvers.
    pub track_simplify_tolerance_m: f64,
    /// Travel speed used to derive step durations.
    pub assumed_speed_mps: f64,
}

impl Default for GpxProviderConfig {
    fn default() -> Self {
        Self {
            destination_match_radius_m: 150.0,
            track_simplify_tolerance_m: 50.0,
            assumed_speed_mps: 13.9,
        }
    }
}

impl GpxProviderConfig {
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Step durations divide by the assumed speed, so it must be positive.
    pub fn validate(&self) -> Result<(), NavError> {
        if !(self.assumed_speed_mps > 0.0) {
            return Err(NavError::Config("assumed_speed_mps must be positive".into()));
        }
        if !(self.track_simplify_tolerance_m >= 0.0) {
            return Err(NavError::Config("track_simplify_tolerance_m must not be negative".into()));
        }
        Ok(())
    }
}
