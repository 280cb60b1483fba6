//! Voice narration.
//!
//! A [`Narrator`] turns navigation events into utterances for a
//! [`NarrationSink`] (platform text-to-speech). Interrupting an utterance
//! that is still playing is the sink's job; the narrator never queues.

use crossbeam_channel::Receiver;

use crate::events::NavEvent;

/// Speech output. Implementations replace any utterance in progress.
pub trait NarrationSink {
    fn speak(&mut self, text: &str);
}

/// Writes utterances to the log, for hosts without speech output.
#[derive(Debug, Default)]
pub struct LogSink;

impl NarrationSink for LogSink {
    fn speak(&mut self, text: &str) {
        log::info!("speak: {text}");
    }
}

/// Speaks narrated events through a sink, honoring mute and live-audio state.
#[derive(Debug)]
pub struct Narrator<S: NarrationSink> {
    sink: S,
    muted: bool,
    live_session_active: bool,
}

impl<S: NarrationSink> Narrator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            muted: false,
            live_session_active: false,
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// A live two-way audio session owns the speaker while active.
    pub fn set_live_session_active(&mut self, active: bool) {
        self.live_session_active = active;
    }

    pub fn is_suppressed(&self) -> bool {
        self.muted || self.live_session_active
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Speak the event's narration unless output is suppressed.
    /// Returns whether anything was spoken.
    pub fn handle(&mut self, event: &NavEvent) -> bool {
        let Some(text) = event.narration() else {
            return false;
        };
        if self.is_suppressed() {
            log::debug!("narration suppressed: {text}");
            return false;
        }
        self.sink.speak(text);
        true
    }

    /// Handle every event already waiting on `events` without blocking.
    pub fn drain(&mut self, events: &Receiver<NavEvent>) -> usize {
        events.try_iter().filter(|event| self.handle(event)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EndReason, EventBus};

    #[derive(Default)]
    struct RecordingSink {
        spoken: Vec<String>,
    }

    impl NarrationSink for RecordingSink {
        fn speak(&mut self, text: &str) {
            self.spoken.push(text.to_string());
        }
    }

    #[test]
    fn speaks_narrated_events_only() {
        let mut narrator = Narrator::new(RecordingSink::default());

        assert!(narrator.handle(&NavEvent::Arrived));
        assert!(!narrator.handle(&NavEvent::SessionEnded { reason: EndReason::Arrived }));

        assert_eq!(narrator.sink().spoken, vec!["You have arrived at your destination."]);
    }

    #[test]
    fn muted_narrator_stays_silent() {
        let mut narrator = Narrator::new(RecordingSink::default());
        narrator.set_muted(true);

        assert!(!narrator.handle(&NavEvent::Arrived));
        assert!(narrator.sink().spoken.is_empty());
    }

    #[test]
    fn live_session_suppresses_output() {
        let mut narrator = Narrator::new(RecordingSink::default());
        narrator.set_live_session_active(true);
        assert!(!narrator.handle(&NavEvent::RouteUnavailable));

        narrator.set_live_session_active(false);
        assert!(narrator.handle(&NavEvent::RouteUnavailable));
        assert_eq!(narrator.sink().spoken, vec!["Could not calculate route."]);
    }

    #[test]
    fn log_sink_accepts_utterances() {
        let mut narrator = Narrator::new(LogSink);
        assert!(narrator.handle(&NavEvent::Arrived));
    }

    #[test]
    fn drain_consumes_pending_events() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        bus.publish(NavEvent::InstructionAnnounced { step_index: 0, instruction: "Head west".into() });
        bus.publish(NavEvent::SessionStarted { step_count: 2, total_distance_m: 1.0, total_duration_s: 1.0 });
        bus.publish(NavEvent::SessionEnded { reason: EndReason::Cancelled });

        let mut narrator = Narrator::new(RecordingSink::default());
        assert_eq!(narrator.drain(&rx), 2);
        assert_eq!(narrator.sink().spoken, vec!["Head west", "Navigation ended."]);
        assert_eq!(narrator.drain(&rx), 0);
    }
}
