use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};
use uuid::Uuid;

/// Trip categories offered by the catalog
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    Adventure,
    Cultural,
    Relaxation,
    Business,
    Family,
    Romantic,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Adventure => "ADVENTURE",
            TripType::Cultural => "CULTURAL",
            TripType::Relaxation => "RELAXATION",
            TripType::Business => "BUSINESS",
            TripType::Family => "FAMILY",
            TripType::Romantic => "ROMANTIC",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown trip type: {0}")]
pub struct UnknownTripType(pub String);

impl FromStr for TripType {
    type Err = UnknownTripType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADVENTURE" => Ok(TripType::Adventure),
            "CULTURAL" => Ok(TripType::Cultural),
            "RELAXATION" => Ok(TripType::Relaxation),
            "BUSINESS" => Ok(TripType::Business),
            "FAMILY" => Ok(TripType::Family),
            "ROMANTIC" => Ok(TripType::Romantic),
            other => Err(UnknownTripType(other.to_string())),
        }
    }
}

/// A bookable travel package with a fixed seat capacity. The catalog owns
/// this record; the booking engine reads it and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub title: String,
    pub destination_id: Uuid,
    pub description: Option<String>,
    pub trip_type: TripType,
    pub duration_days: u32,
    pub price_cents: i64,
    pub total_capacity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(
        title: impl Into<String>,
        destination_id: Uuid,
        trip_type: TripType,
        price_cents: i64,
        total_capacity: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        let duration_days = (end_date - start_date).num_days().max(1) as u32;
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            destination_id,
            description: None,
            trip_type,
            duration_days,
            price_cents,
            total_capacity,
            start_date,
            end_date,
            is_active: true,
            is_featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_past(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }

    /// A trip takes bookings while it is active and has not ended.
    /// Seat availability is the capacity ledger's concern, not the catalog's.
    pub fn can_book(&self, today: NaiveDate) -> bool {
        self.is_active && !self.is_past(today)
    }

    /// Departure instant used for cancellation-window arithmetic.
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.start_date.and_time(NaiveTime::MIN).and_utc()
    }
}

/// Read access to the trip catalog.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn fetch_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>>;
}

/// HashMap-backed catalog for tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryTripCatalog {
    trips: RwLock<HashMap<Uuid, Trip>>,
}

impl InMemoryTripCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a trip.
    pub fn insert(&self, trip: Trip) {
        self.trips
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(trip.id, trip);
    }
}

#[async_trait]
impl TripRepository for InMemoryTripCatalog {
    async fn fetch_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        let trips = self.trips.read().unwrap_or_else(PoisonError::into_inner);
        Ok(trips.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_trip(start_offset_days: i64, length_days: i64) -> Trip {
        let today = Utc::now().date_naive();
        let start = today + Duration::days(start_offset_days);
        Trip::new(
            "Sahara Trek",
            Uuid::new_v4(),
            TripType::Adventure,
            125_000,
            16,
            start,
            start + Duration::days(length_days),
        )
    }

    #[test]
    fn test_can_book_active_future_trip() {
        let today = Utc::now().date_naive();
        let trip = sample_trip(10, 5);
        assert!(trip.can_book(today));
        assert!(!trip.is_past(today));
    }

    #[test]
    fn test_past_or_inactive_trip_rejects_booking() {
        let today = Utc::now().date_naive();

        let ended = sample_trip(-10, 5);
        assert!(ended.is_past(today));
        assert!(!ended.can_book(today));

        let mut paused = sample_trip(10, 5);
        paused.is_active = false;
        assert!(!paused.can_book(today));
    }

    #[test]
    fn test_trip_type_round_trip() {
        for trip_type in [
            TripType::Adventure,
            TripType::Cultural,
            TripType::Relaxation,
            TripType::Business,
            TripType::Family,
            TripType::Romantic,
        ] {
            assert_eq!(trip_type.as_str().parse::<TripType>().unwrap(), trip_type);
        }
        assert!("SPACE".parse::<TripType>().is_err());
    }

    #[tokio::test]
    async fn test_in_memory_catalog_fetch() {
        let catalog = InMemoryTripCatalog::new();
        let trip = sample_trip(10, 5);
        let trip_id = trip.id;
        catalog.insert(trip);

        let found = catalog.fetch_trip(trip_id).await.unwrap();
        assert_eq!(found.map(|t| t.id), Some(trip_id));
        assert!(catalog.fetch_trip(Uuid::new_v4()).await.unwrap().is_none());
    }
}
