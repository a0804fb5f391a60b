use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use voyago_catalog::ReservationToken;
use voyago_core::Actor;
use voyago_shared::Redacted;

/// Booking lifecycle states
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }

    /// Cancelled and completed bookings never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown booking status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// How to reach the person the booking is for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Redacted<String>,
    pub phone: Option<Redacted<String>>,
}

impl ContactInfo {
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Redacted::new(email.into()),
            phone: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub number_of_people: u32,
    pub contact: ContactInfo,
    pub special_requests: Option<String>,
}

/// A reservation of seats on one trip for one requester. Mutated only
/// through the booking service's transitions; the party size is fixed at
/// creation (resizing means cancel and rebook).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub requester_id: String,
    pub number_of_people: u32,
    pub total_price_cents: i64,
    pub status: BookingStatus,
    pub contact: ContactInfo,
    pub special_requests: Option<String>,
    pub reservation: ReservationToken,
    pub confirmation_date: Option<DateTime<Utc>>,
    pub cancellation_date: Option<DateTime<Utc>>,
    pub status_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        trip_id: Uuid,
        requester_id: String,
        number_of_people: u32,
        total_price_cents: i64,
        contact: ContactInfo,
        special_requests: Option<String>,
        reservation: ReservationToken,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id,
            requester_id,
            number_of_people,
            total_price_cents,
            status: BookingStatus::Pending,
            contact,
            special_requests,
            reservation,
            confirmation_date: None,
            cancellation_date: None,
            status_changed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            BookingStatus::Pending | BookingStatus::Confirmed
        )
    }

    /// Applies a new status and stamps the transition timestamps. Legality
    /// of the transition is the lifecycle table's concern, checked before
    /// this is called.
    pub fn apply_status(&mut self, next: BookingStatus) {
        let now = Utc::now();
        self.status = next;
        self.status_changed_at = now;
        self.updated_at = now;
        match next {
            BookingStatus::Confirmed => self.confirmation_date = Some(now),
            BookingStatus::Cancelled => self.cancellation_date = Some(now),
            _ => {}
        }
    }
}

/// Immutable record of one status transition. Appended for every
/// transition, never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub previous_status: Option<BookingStatus>,
    pub new_status: BookingStatus,
    pub actor_id: String,
    pub reason: Option<String>,
    pub changed_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(
        booking_id: Uuid,
        previous_status: Option<BookingStatus>,
        new_status: BookingStatus,
        actor: &Actor,
        reason: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            previous_status,
            new_status,
            actor_id: actor.id.clone(),
            reason,
            changed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("EXPIRED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Confirmed.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
        assert!(BookingStatus::Completed.is_terminal());
    }

    #[test]
    fn test_apply_status_stamps_dates() {
        let token = voyago_catalog::ReservationToken::from_parts(Uuid::new_v4(), Uuid::new_v4(), 2);
        let mut booking = Booking::new(
            token.trip_id(),
            "user-1".to_string(),
            2,
            50_000,
            ContactInfo::email("traveler@example.com"),
            None,
            token,
        );
        assert_eq!(booking.status, BookingStatus::Pending);
        assert!(booking.confirmation_date.is_none());

        booking.apply_status(BookingStatus::Confirmed);
        assert!(booking.confirmation_date.is_some());
        assert!(booking.cancellation_date.is_none());

        booking.apply_status(BookingStatus::Cancelled);
        assert!(booking.cancellation_date.is_some());
        assert!(!booking.is_active());
    }
}
