//! Navigation session control.
//!
//! `NavigationController` owns the progress tracker and the event bus. It
//! starts sessions from routing-provider responses, feeds location samples
//! into the tracker, and ends sessions on request.
//!
//! Route fetching is split in two halves so the host can run the provider
//! call wherever it likes: [`NavigationController::begin_request`] hands out
//! a ticket, [`NavigationController::complete_request`] applies the response.
//! Only the latest ticket is live; ending navigation or issuing a newer
//! request makes older responses bounce with [`NavError::UnknownRequest`].

use crossbeam_channel::Receiver;
use serde::Serialize;

use crate::config::NavigationConfig;
use crate::error::NavError;
use crate::events::{EndReason, EventBus, NavEvent};
use crate::format::{format_distance, format_duration, mps_to_kmh};
use crate::geo::Coordinate;
use crate::provider::RoutingProvider;
use crate::route::{Maneuver, NavigationRoute, SpeedLimit};
use crate::tracker::{LocationSample, ProgressTracker, TrackerState, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Begin navigating once the route arrives.
    Start,
    /// Only show the route.
    Preview,
}

/// Identifies one in-flight route request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(u64);

impl RequestTicket {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// A registered request: the host fetches a route from `origin` to
/// `destination` and reports back with `ticket`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub ticket: RequestTicket,
    pub kind: RequestKind,
    pub origin: Coordinate,
    pub destination: Coordinate,
}

/// What a completed request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Started,
    Previewed,
}

/// Everything a direction card needs to render the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub navigating: bool,
    pub state: TrackerState,
    pub step_index: usize,
    pub instruction: Option<String>,
    pub maneuver: Option<Maneuver>,
    pub step_distance_m: Option<f64>,
    pub speed_limit: Option<SpeedLimit>,
    pub remaining_distance_m: f64,
    pub remaining_time_s: f64,
    pub remaining_distance_text: String,
    pub remaining_time_text: String,
    pub distance_to_maneuver_m: Option<f64>,
    pub near_destination: bool,
    pub current_speed_kmh: Option<f64>,
    pub speeding: bool,
}

/// Single owner of navigation state.
///
/// All mutation goes through `&mut self`, so location updates, route
/// responses and user commands are applied one at a time in call order.
pub struct NavigationController {
    tracker: ProgressTracker,
    bus: EventBus,
    last_sample: Option<LocationSample>,
    location_warned: bool,
    preview: Option<NavigationRoute>,
    pending: Option<RouteRequest>,
    next_ticket: u64,
}

impl NavigationController {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            tracker: ProgressTracker::new(config),
            bus: EventBus::new(),
            last_sample: None,
            location_warned: false,
            preview: None,
            pending: None,
            next_ticket: 1,
        }
    }

    /// Receive every event published from now on.
    pub fn subscribe(&mut self) -> Receiver<NavEvent> {
        self.bus.subscribe()
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn state(&self) -> TrackerState {
        self.tracker.state()
    }

    pub fn is_navigating(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn last_location(&self) -> Option<Coordinate> {
        self.last_sample.map(|s| s.coordinate)
    }

    pub fn preview(&self) -> Option<&NavigationRoute> {
        self.preview.as_ref()
    }

    /// Dismiss the preview route, if any.
    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    pub fn pending_request(&self) -> Option<&RouteRequest> {
        self.pending.as_ref()
    }

    /// Feed one location sample. Samples are applied in arrival order.
    pub fn on_location(&mut self, sample: LocationSample) -> Transition {
        self.last_sample = Some(sample);
        self.location_warned = false;

        let tick = self.tracker.on_location(&sample.coordinate);
        self.bus.publish_all(tick.events);
        tick.transition
    }

    /// The location source failed to start or stopped delivering.
    ///
    /// Warns once until the next sample; an active session simply stalls.
    pub fn on_location_unavailable(&mut self, reason: &str) {
        if self.location_warned {
            return;
        }
        self.location_warned = true;
        log::warn!("{}", NavError::GeolocationUnavailable(reason.to_string()));
        self.bus.publish(NavEvent::LocationUnavailable {
            reason: reason.to_string(),
        });
    }

    /// Register a route request from the last known location.
    ///
    /// Supersedes any request still in flight, except that a preview never
    /// displaces a pending start.
    pub fn begin_request(
        &mut self,
        kind: RequestKind,
        destination: Coordinate,
    ) -> Result<RouteRequest, NavError> {
        if kind == RequestKind::Preview {
            if self.tracker.is_active() {
                return Err(NavError::SessionActive);
            }
            if self.pending.is_some_and(|p| p.kind == RequestKind::Start) {
                log::debug!("preview rejected: {}", NavError::StartPending);
                return Err(NavError::StartPending);
            }
        }
        let origin = self.last_location().ok_or(NavError::NoLocationFix)?;

        let ticket = RequestTicket(self.next_ticket);
        self.next_ticket += 1;

        if let Some(previous) = self.pending.take() {
            log::debug!("route request {} superseded", previous.ticket.as_raw());
        }
        let request = RouteRequest {
            ticket,
            kind,
            origin,
            destination,
        };
        self.pending = Some(request);
        Ok(request)
    }

    /// Apply the provider's answer to a request.
    pub fn complete_request(
        &mut self,
        ticket: RequestTicket,
        route: Option<NavigationRoute>,
    ) -> Result<RequestOutcome, NavError> {
        let request = match self.pending {
            Some(request) if request.ticket == ticket => request,
            _ => {
                log::debug!("discarding response for route request {}", ticket.as_raw());
                return Err(NavError::UnknownRequest);
            }
        };
        self.pending = None;

        match request.kind {
            RequestKind::Start => {
                let Some(route) = route else {
                    return Err(self.route_unavailable());
                };
                match self.tracker.begin(route) {
                    Ok(events) => {
                        self.preview = None;
                        self.bus.publish_all(events);
                        Ok(RequestOutcome::Started)
                    }
                    Err(_) => Err(self.route_unavailable()),
                }
            }
            RequestKind::Preview => {
                let route = route.ok_or(NavError::RouteUnavailable)?;
                self.preview = Some(route);
                Ok(RequestOutcome::Previewed)
            }
        }
    }

    /// Fetch a route to `destination` and start following it.
    pub fn start_navigation<P: RoutingProvider + ?Sized>(
        &mut self,
        provider: &P,
        destination: Coordinate,
    ) -> Result<(), NavError> {
        let request = self.begin_request(RequestKind::Start, destination)?;
        let route = provider.get_directions(request.origin, request.destination);
        self.complete_request(request.ticket, route).map(|_| ())
    }

    /// Fetch a route to `destination` for display only.
    pub fn preview_route<P: RoutingProvider + ?Sized>(
        &mut self,
        provider: &P,
        destination: Coordinate,
    ) -> Result<&NavigationRoute, NavError> {
        let request = self.begin_request(RequestKind::Preview, destination)?;
        let route = provider.get_directions(request.origin, request.destination);
        self.complete_request(request.ticket, route)?;
        self.preview.as_ref().ok_or(NavError::RouteUnavailable)
    }

    /// Stop navigating and cancel any in-flight request.
    ///
    /// Always announces the end, even when nothing was active.
    pub fn end_navigation(&mut self) {
        if let Some(request) = self.pending.take() {
            log::debug!("route request {} cancelled", request.ticket.as_raw());
        }
        if self.tracker.end() {
            log::info!("navigation ended by user");
        }
        self.bus.publish(NavEvent::SessionEnded {
            reason: EndReason::Cancelled,
        });
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let step = self.tracker.current_step();
        let remaining = self.tracker.remaining();
        let speed_limit = step.and_then(|s| s.speed_limit);
        let current_speed_kmh = self.last_sample.and_then(|s| s.speed).map(mps_to_kmh);

        let limit_kmh = speed_limit
            .map(|l| l.as_kmh())
            .unwrap_or(self.tracker.config().fallback_speed_limit_kmh);
        let speeding = self.tracker.is_active() && current_speed_kmh.is_some_and(|v| v > limit_kmh);

        SessionSnapshot {
            navigating: self.tracker.is_active(),
            state: self.tracker.state(),
            step_index: self.tracker.current_step_index(),
            instruction: step.map(|s| s.instruction.clone()),
            maneuver: step.map(|s| s.maneuver.clone()),
            step_distance_m: step.map(|s| s.distance),
            speed_limit,
            remaining_distance_m: remaining.distance_m,
            remaining_time_s: remaining.duration_s,
            remaining_distance_text: format_distance(remaining.distance_m),
            remaining_time_text: format_duration(remaining.duration_s),
            distance_to_maneuver_m: self
                .last_location()
                .and_then(|loc| self.tracker.distance_to_maneuver(&loc)),
            near_destination: self.tracker.has_alerted_near_destination(),
            current_speed_kmh,
            speeding,
        }
    }

    fn route_unavailable(&mut self) -> NavError {
        log::warn!("{}", NavError::RouteUnavailable);
        self.bus.publish(NavEvent::RouteUnavailable);
        NavError::RouteUnavailable
    }
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}
