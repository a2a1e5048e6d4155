//! Ledger event types.
//!
//! A [`StatusEvent`] records the state of the space *after* a toggle. Events
//! are created once and never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Surrogate key assigned by the ledger on append.
///
/// Ids grow monotonically, so among events with equal timestamps the larger
/// id is the later one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub i64);

impl EventId {
    pub fn new(value: i64) -> Self {
        EventId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed ledger row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: EventId,
    /// State of the space after this event.
    pub is_open: bool,
    /// UTC instant supplied by the caller at append time.
    pub timestamp: DateTime<Utc>,
}

/// An event that has not been assigned an id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStatusEvent {
    pub is_open: bool,
    pub timestamp: DateTime<Utc>,
}

impl NewStatusEvent {
    pub fn new(is_open: bool, timestamp: DateTime<Utc>) -> Self {
        Self { is_open, timestamp }
    }

    /// Attach the id the ledger assigned.
    pub fn with_id(self, id: EventId) -> StatusEvent {
        StatusEvent {
            id,
            is_open: self.is_open,
            timestamp: self.timestamp,
        }
    }
}

/// Result of a conditional append.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// The event was committed.
    Appended(StatusEvent),
    /// Another event was committed after the caller's read; nothing was written.
    /// Carries the event that is now the latest.
    Stale(Option<StatusEvent>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_id_display_and_value() {
        let id = EventId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert!(EventId::new(1) < EventId::new(2));
    }

    #[test]
    fn test_new_event_with_id() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let event = NewStatusEvent::new(true, ts).with_id(EventId(7));
        assert_eq!(event.id, EventId(7));
        assert!(event.is_open);
        assert_eq!(event.timestamp, ts);
    }
}
