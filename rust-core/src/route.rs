//! Route data model.
//!
//! A `NavigationRoute` is produced once by a routing provider and never
//! mutated afterwards; a new session always asks for a fresh one.

use serde::{Deserialize, Serialize};
use crate::geo::Coordinate;

/// The action associated with a route step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Maneuver type, e.g. "depart", "turn", "arrive".
    #[serde(rename = "type")]
    pub kind: String,
    /// Direction modifier, e.g. "left", "slight right".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
    /// Trigger coordinate. `None` marks a malformed step.
    #[serde(default)]
    pub location: Option<Coordinate>,
}

impl Maneuver {
    pub fn new(kind: impl Into<String>, modifier: Option<String>, location: Coordinate) -> Self {
        Self {
            kind: kind.into(),
            modifier,
            location: Some(location),
        }
    }

    pub fn is_arrival(&self) -> bool {
        self.kind == "arrive"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedUnit {
    #[serde(rename = "km/h")]
    KilometersPerHour,
    #[serde(rename = "mph")]
    MilesPerHour,
}

/// Posted speed limit attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimit {
    pub value: f64,
    pub unit: SpeedUnit,
}

impl SpeedLimit {
    pub fn as_kmh(&self) -> f64 {
        match self.unit {
            SpeedUnit::KilometersPerHour => self.value,
            SpeedUnit::MilesPerHour => self.value * 1.609_344,
        }
    }
}

/// One maneuver segment of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Spoken/displayed instruction. Empty when the provider sent none.
    pub instruction: String,
    pub maneuver: Maneuver,
    /// Step length in meters.
    pub distance: f64,
    /// Step travel time in seconds.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_limit: Option<SpeedLimit>,
}

impl RouteStep {
    pub fn maneuver_location(&self) -> Option<Coordinate> {
        self.maneuver.location
    }

    pub fn has_instruction(&self) -> bool {
        !self.instruction.trim().is_empty()
    }
}

/// An ordered list of steps plus totals and a rendering-only geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRoute {
    pub steps: Vec<RouteStep>,
    /// Total distance in meters as reported by the provider.
    pub distance: f64,
    /// Total duration in seconds as reported by the provider.
    pub duration: f64,
    #[serde(default)]
    pub geometry: Vec<Coordinate>,
}

/// Distance and time left from a given step to the end of the route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RemainingMetrics {
    pub distance_m: f64,
    pub duration_s: f64,
}

impl NavigationRoute {
    /// Build a route whose totals are the sums of its step metrics.
    pub fn from_steps(steps: Vec<RouteStep>, geometry: Vec<Coordinate>) -> Self {
        let distance = steps.iter().map(|s| s.distance).sum();
        let duration = steps.iter().map(|s| s.duration).sum();
        Self {
            steps,
            distance,
            duration,
            geometry,
        }
    }

    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    /// Sum of step distance/duration from `from` (inclusive) to the end.
    ///
    /// Uses the provider's per-step metrics, not live GPS distance.
    pub fn remaining_from(&self, from: usize) -> RemainingMetrics {
        self.steps
            .iter()
            .skip(from)
            .fold(RemainingMetrics::default(), |acc, step| RemainingMetrics {
                distance_m: acc.distance_m + step.distance,
                duration_s: acc.duration_s + step.duration,
            })
    }
}
