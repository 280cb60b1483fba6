//! Navigation events and their broadcast.
//!
//! The tracker and controller publish [`NavEvent`]s to an [`EventBus`];
//! narration, UI, and logging each hold their own receiver.

use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Cancelled,
    Arrived,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavEvent {
    SessionStarted {
        step_count: usize,
        total_distance_m: f64,
        total_duration_s: f64,
    },
    InstructionAnnounced {
        step_index: usize,
        instruction: String,
    },
    ArrivingShortly {
        remaining_distance_m: f64,
        remaining_time_s: f64,
    },
    Arrived,
    SessionEnded {
        reason: EndReason,
    },
    RouteUnavailable,
    LocationUnavailable {
        reason: String,
    },
}

impl NavEvent {
    /// Text to speak for this event, if any.
    pub fn narration(&self) -> Option<&str> {
        match self {
            NavEvent::InstructionAnnounced { instruction, .. } => Some(instruction),
            NavEvent::ArrivingShortly { .. } => Some("You are arriving shortly."),
            NavEvent::Arrived => Some("You have arrived at your destination."),
            NavEvent::SessionEnded { reason: EndReason::Cancelled } => Some("Navigation ended."),
            NavEvent::RouteUnavailable => Some("Could not calculate route."),
            NavEvent::SessionStarted { .. }
            | NavEvent::SessionEnded { reason: EndReason::Arrived }
            | NavEvent::LocationUnavailable { .. } => None,
        }
    }
}

/// Fan-out of events to any number of subscribers.
///
/// Publishing never blocks; subscribers whose receiver was dropped are
/// pruned on the next publish.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<NavEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener. The channel is unbounded, so publishing
    /// never waits on a slow reader.
    pub fn subscribe(&mut self) -> Receiver<NavEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Send `event` to every live subscriber.
    pub fn publish(&mut self, event: NavEvent) {
        log::debug!("event: {event:?}");
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = NavEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}
