//! Turn-by-turn progress tracking.
//!
//! Converts a stream of location samples into step progress and
//! narration events for one active route. The tracker never suspends and
//! never fails an update: bad input degrades to "no transition this tick".
//!
//! Per update, in order:
//! 1. Step advance: if the sample lies within the arrival threshold of the
//!    current step's maneuver, move to the next step (at most one per
//!    update), or declare arrival on the last step.
//! 2. Remaining metrics: fold the provider's step distance/duration from the
//!    current step to the end.
//! 3. Near-destination alert: fire once per session when time and distance
//!    left fall inside the configured window.

use serde::{Deserialize, Serialize};

use crate::config::NavigationConfig;
use crate::error::NavError;
use crate::events::{EndReason, NavEvent};
use crate::geo::Coordinate;
use crate::route::{NavigationRoute, RemainingMetrics, RouteStep};

/// One sample from the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub coordinate: Coordinate,
    /// Ground speed in meters per second, when the source reports it.
    #[serde(default)]
    pub speed: Option<f64>,
}

impl LocationSample {
    pub fn new(coordinate: Coordinate, speed: Option<f64>) -> Self {
        Self { coordinate, speed }
    }

    pub fn at(lat: f64, lng: f64) -> Self {
        Self::new(Coordinate::new(lat, lng), None)
    }
}

/// Externally visible tracker state. `OnStep` always indexes a real step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum TrackerState {
    NoRoute,
    OnStep(usize),
}

/// What a single update did to the step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No route, or the current step has no usable maneuver coordinate.
    Skipped,
    /// Still short of the current maneuver.
    Idle,
    Advanced { from: usize, to: usize },
    /// The last maneuver was reached; the tracker is now empty.
    Arrived,
}

/// Result of [`ProgressTracker::on_location`]: the step transition plus the
/// events to publish, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub transition: Transition,
    pub events: Vec<NavEvent>,
}

/// Follows one route at a time.
///
/// Between sessions the tracker holds no route and ignores samples. While a
/// route is active, `current_step` is a valid index into it, the near
/// destination alert fires at most once, and each step index is announced
/// at most once.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    config: NavigationConfig,
    route: Option<NavigationRoute>,
    current_step: usize,
    alerted_near_destination: bool,
    remaining: RemainingMetrics,
    // Guards "announce once per index value".
    announced_step: Option<usize>,
}

impl ProgressTracker {
    /// Idle tracker using `config` for every session it runs.
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            route: None,
            current_step: 0,
            alerted_near_destination: false,
            remaining: RemainingMetrics::default(),
            announced_step: None,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn state(&self) -> TrackerState {
        // current_step is meaningless without a route
        match self.route {
            Some(_) => TrackerState::OnStep(self.current_step),
            None => TrackerState::NoRoute,
        }
    }

    pub fn is_active(&self) -> bool {
        self.route.is_some()
    }

    pub fn route(&self) -> Option<&NavigationRoute> {
        self.route.as_ref()
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step
    }

    pub fn current_step(&self) -> Option<&RouteStep> {
        self.route.as_ref()?.steps.get(self.current_step)
    }

    /// Distance and time left, as of the last update.
    pub fn remaining(&self) -> RemainingMetrics {
        self.remaining
    }

    pub fn has_alerted_near_destination(&self) -> bool {
        self.alerted_near_destination
    }

    /// Live distance from `location` to the current maneuver.
    pub fn distance_to_maneuver(&self, location: &Coordinate) -> Option<f64> {
        let target = self.current_step()?.maneuver_location()?;
        Some(location.distance_to(&target))
    }

    /// Start following `route` from its first step.
    ///
    /// Returns the session-start and first-instruction events. A route
    /// without steps cannot be followed and is rejected.
    pub fn begin(&mut self, route: NavigationRoute) -> Result<Vec<NavEvent>, NavError> {
        if route.steps.is_empty() {
            return Err(NavError::RouteUnavailable);
        }

        self.reset();
        let started = NavEvent::SessionStarted {
            step_count: route.steps.len(),
            total_distance_m: route.distance,
            total_duration_s: route.duration,
        };
        self.remaining = route.remaining_from(0);
        self.route = Some(route);

        let mut events = vec![started];
        events.extend(self.announce_current());
        log::info!(
            "navigation started: {} steps, {:.0} m, {:.0} s",
            self.route.as_ref().map_or(0, |r| r.steps.len()),
            self.remaining.distance_m,
            self.remaining.duration_s
        );
        Ok(events)
    }

    /// Drop the active route. Returns whether a route was active.
    pub fn end(&mut self) -> bool {
        let was_active = self.route.is_some();
        self.reset();
        was_active
    }

    /// Process one location sample.
    ///
    /// Only the current step's maneuver is compared against `location`,
    /// so a missed turn is never skipped past.
    pub fn on_location(&mut self, location: &Coordinate) -> Tick {
        let (target, is_last) = match &self.route {
            Some(route) => {
                let step = &route.steps[self.current_step];
                (step.maneuver_location(), Some(self.current_step) == route.last_index())
            }
            None => {
                return Tick {
                    transition: Transition::Skipped,
                    events: Vec::new(),
                }
            }
        };

        let mut events = Vec::new();
        let transition = match target {
            None => {
                log::warn!("step {} has no maneuver location, not advancing", self.current_step);
                Transition::Skipped
            }
            Some(target) => {
                let distance = location.distance_to(&target);
                log::debug!("step {}: {:.1} m to maneuver", self.current_step, distance);

                // NaN distances compare false and keep the current step.
                if distance < self.config.arrival_threshold_m {
                    if is_last {
                        events.push(NavEvent::Arrived);
                        events.push(NavEvent::SessionEnded { reason: EndReason::Arrived });
                        self.reset();
                        log::info!("arrived at destination");
                        return Tick {
                            transition: Transition::Arrived,
                            events,
                        };
                    }
                    let from = self.current_step;
                    self.current_step += 1;
                    events.extend(self.announce_current());
                    Transition::Advanced {
                        from,
                        to: self.current_step,
                    }
                } else {
                    Transition::Idle
                }
            }
        };

        if let Some(route) = &self.route {
            self.remaining = route.remaining_from(self.current_step);
        }
        events.extend(self.check_near_destination());

        Tick { transition, events }
    }

    fn announce_current(&mut self) -> Option<NavEvent> {
        if self.announced_step == Some(self.current_step) {
            return None;
        }
        self.announced_step = Some(self.current_step);

        let step = self.current_step()?;
        if !step.has_instruction() {
            log::warn!("{}", NavError::MalformedStep { index: self.current_step });
            return None;
        }
        Some(NavEvent::InstructionAnnounced {
            step_index: self.current_step,
            instruction: step.instruction.clone(),
        })
    }

    // Bounds are strict on all three sides.
    fn check_near_destination(&mut self) -> Option<NavEvent> {
        let RemainingMetrics { distance_m, duration_s } = self.remaining;
        let within = duration_s < self.config.near_destination_max_time_s
            && distance_m > self.config.near_destination_min_distance_m
            && distance_m < self.config.near_destination_max_distance_m;

        if !within || self.alerted_near_destination {
            return None;
        }
        self.alerted_near_destination = true;
        Some(NavEvent::ArrivingShortly {
            remaining_distance_m: distance_m,
            remaining_time_s: duration_s,
        })
    }

    fn reset(&mut self) {
        self.route = None;
        self.current_step = 0;
        self.alerted_near_destination = false;
        self.remaining = RemainingMetrics::default();
        self.announced_step = None;
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}
