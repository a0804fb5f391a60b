use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a booking. Drives which notification template the
/// downstream dispatcher picks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventKind {
    Created,
    Confirmed,
    Cancelled,
    TripReminder,
}

impl BookingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEventKind::Created => "CREATED",
            BookingEventKind::Confirmed => "CONFIRMED",
            BookingEventKind::Cancelled => "CANCELLED",
            BookingEventKind::TripReminder => "TRIP_REMINDER",
        }
    }
}

/// Notification payload handed to the dispatch seam after a durable
/// state change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingEvent {
    pub booking_id: Uuid,
    pub trip_id: Uuid,
    pub kind: BookingEventKind,
    pub recipient: String,
    pub occurred_at: DateTime<Utc>,
}

impl BookingEvent {
    pub fn new(booking_id: Uuid, trip_id: Uuid, kind: BookingEventKind, recipient: String) -> Self {
        Self {
            booking_id,
            trip_id,
            kind,
            recipient,
            occurred_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_serialization() {
        let event = BookingEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BookingEventKind::TripReminder,
            "traveler@example.com".to_string(),
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"TRIP_REMINDER\""));

        let back: BookingEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
