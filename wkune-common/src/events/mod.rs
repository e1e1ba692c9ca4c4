//! Event types for the WKUNE event system
//!
//! Provides the session event definitions and the EventBus that fans them
//! out to connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::Phase;

/// Session event types
///
/// One event per committed state change, addressed to every member of the
/// session named by `session_code`. Events are hints: delivery is
/// best-effort and ordering is not guaranteed to match write order, so
/// receivers re-fetch the session state instead of trusting payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Something changed (items, readiness, acceptance, membership)
    ///
    /// Triggers:
    /// - SSE: clients re-fetch the state snapshot
    Refresh {
        session_code: String,
        timestamp: DateTime<Utc>,
    },

    /// Readiness barrier released and the phase advanced
    ///
    /// Triggers:
    /// - SSE: clients switch screens
    PhaseChanged {
        session_code: String,
        /// Phase after the transition
        phase: Phase,
        timestamp: DateTime<Utc>,
    },

    /// A result was drawn (entering RESULT, reroll, or roll-next)
    ///
    /// `item` is None when the pool is empty.
    ResultSelected {
        session_code: String,
        item: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A member voted to restart but the vote is not yet unanimous
    RestartVoteUpdate {
        session_code: String,
        votes: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Unanimous restart: session is back in ADDING with a clean slate
    SessionReset {
        session_code: String,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Session this event is addressed to
    pub fn session_code(&self) -> &str {
        match self {
            SessionEvent::Refresh { session_code, .. }
            | SessionEvent::PhaseChanged { session_code, .. }
            | SessionEvent::ResultSelected { session_code, .. }
            | SessionEvent::RestartVoteUpdate { session_code, .. }
            | SessionEvent::SessionReset { session_code, .. } => session_code,
        }
    }

    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::Refresh { .. } => "Refresh",
            SessionEvent::PhaseChanged { .. } => "PhaseChanged",
            SessionEvent::ResultSelected { .. } => "ResultSelected",
            SessionEvent::RestartVoteUpdate { .. } => "RestartVoteUpdate",
            SessionEvent::SessionReset { .. } => "SessionReset",
        }
    }

    pub fn refresh(session_code: &str) -> Self {
        SessionEvent::Refresh {
            session_code: session_code.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn phase_changed(session_code: &str, phase: Phase) -> Self {
        SessionEvent::PhaseChanged {
            session_code: session_code.to_string(),
            phase,
            timestamp: Utc::now(),
        }
    }

    pub fn result_selected(session_code: &str, item: Option<String>) -> Self {
        SessionEvent::ResultSelected {
            session_code: session_code.to_string(),
            item,
            timestamp: Utc::now(),
        }
    }

    pub fn restart_vote_update(session_code: &str, votes: usize, total: usize) -> Self {
        SessionEvent::RestartVoteUpdate {
            session_code: session_code.to_string(),
            votes,
            total,
            timestamp: Utc::now(),
        }
    }

    pub fn session_reset(session_code: &str) -> Self {
        SessionEvent::SessionReset {
            session_code: session_code.to_string(),
            timestamp: Utc::now(),
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for session events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// All sessions share one channel; subscribers filter by session code.
///
/// # Examples
///
/// ```
/// use wkune_common::events::{EventBus, SessionEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit(SessionEvent::refresh("AB3K9Z")).unwrap();
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.session_code(), "AB3K9Z");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SessionEvent::phase_changed("AB3K9Z", Phase::Accepting);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PhaseChanged");
        assert_eq!(json["session_code"], "AB3K9Z");
        assert_eq!(json["phase"], "accepting");
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let event = SessionEvent::result_selected("AB3K9Z", Some("Tea".to_string()));
        let json = serde_json::to_string(&event).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_type_matches_serde_tag() {
        let events = vec![
            SessionEvent::refresh("C"),
            SessionEvent::phase_changed("C", Phase::Result),
            SessionEvent::result_selected("C", None),
            SessionEvent::restart_vote_update("C", 1, 3),
            SessionEvent::session_reset("C"),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
            assert_eq!(event.session_code(), "C");
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        assert!(bus.emit(SessionEvent::refresh("C")).is_err());
        assert_eq!(bus.subscriber_count(), 0);

        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_event() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let count = bus.emit(SessionEvent::session_reset("AB3K9Z")).unwrap();
        assert_eq!(count, 2);

        assert_eq!(rx1.recv().await.unwrap().event_type(), "SessionReset");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "SessionReset");
    }
}
