use crate::models::{Booking, BookingStatus, HistoryRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Storage seam for bookings. Implementations must provide at least
/// read-committed isolation.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn fetch_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Ordered by creation time descending (newest first).
    async fn list_for_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_with_status(
        &self,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Storage seam for the booking audit trail. Append-only.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn append(
        &self,
        record: &HistoryRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Ordered by change time ascending.
    async fn history_for(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<HistoryRecord>, Box<dyn std::error::Error + Send + Sync>>;
}

/// HashMap-backed booking store for tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingStore {
    async fn insert_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self
            .bookings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if bookings.contains_key(&booking.id) {
            return Err(format!("booking already exists: {}", booking.id).into());
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn fetch_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.read().unwrap_or_else(PoisonError::into_inner);
        Ok(bookings.get(&id).cloned())
    }

    async fn update_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut bookings = self
            .bookings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !bookings.contains_key(&booking.id) {
            return Err(format!("booking not present: {}", booking.id).into());
        }
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn list_for_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<Booking> = bookings
            .values()
            .filter(|b| b.requester_id == requester_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn list_with_status(
        &self,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let bookings = self.bookings.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<Booking> = bookings
            .values()
            .filter(|b| statuses.contains(&b.status))
            .cloned()
            .collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(result)
    }
}
