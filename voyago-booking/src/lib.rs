pub mod history;
pub mod lifecycle;
pub mod models;
pub mod outbox;
pub mod repository;
pub mod service;

pub use history::HistoryRecorder;
pub use models::{Booking, BookingStatus, ContactInfo, CreateBookingRequest, HistoryRecord};
pub use outbox::NotificationOutbox;
pub use repository::{BookingRepository, HistoryRepository, InMemoryBookingStore};
pub use service::{BookingPolicy, BookingService};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Errors surfaced by booking operations. Business-rule rejections carry
/// the violated invariant; infrastructure failures stay generic and keep
/// their source for logging.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Capacity exceeded for trip {trip_id}: requested {requested}, available {available}")]
    CapacityExceeded {
        trip_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Trip not found: {0}")]
    TripNotFound(Uuid),

    #[error("Trip is not open for booking: {0}")]
    TripNotBookable(Uuid),

    #[error("A booking must cover at least one person")]
    InvalidPartySize,

    #[error("Requester {requester_id} already has an active booking for trip {trip_id}")]
    DuplicateBooking {
        trip_id: Uuid,
        requester_id: String,
    },

    #[error("Actor {actor_id} is not permitted to perform this operation")]
    Forbidden { actor_id: String },

    #[error("Cancellation window for booking {booking_id} closed at {deadline}")]
    CancellationWindowClosed {
        booking_id: Uuid,
        deadline: DateTime<Utc>,
    },

    #[error("Trip has not ended yet; booking {0} cannot be completed")]
    TripNotEnded(Uuid),

    #[error("Storage unavailable")]
    StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Internal invariant violated: {0}")]
    Internal(String),
}

pub type BookingResult<T> = Result<T, BookingError>;
