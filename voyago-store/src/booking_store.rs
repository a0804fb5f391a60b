use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;
use voyago_booking::models::{Booking, BookingStatus, ContactInfo, HistoryRecord};
use voyago_booking::repository::{BookingRepository, HistoryRepository};
use voyago_catalog::{ReservationToken, Trip, TripRepository, TripType};
use voyago_shared::Redacted;

/// Postgres-backed trip catalog reads.
pub struct PgTripCatalog {
    pool: PgPool,
}

impl PgTripCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres-backed booking store.
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres-backed audit trail.
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    title: String,
    destination_id: Uuid,
    description: Option<String>,
    trip_type: String,
    duration_days: i32,
    price_cents: i64,
    total_capacity: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
    is_active: bool,
    is_featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TripRow {
    fn into_trip(self) -> Result<Trip, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Trip {
            id: self.id,
            title: self.title,
            destination_id: self.destination_id,
            description: self.description,
            trip_type: TripType::from_str(&self.trip_type)?,
            duration_days: u32::try_from(self.duration_days)?,
            price_cents: self.price_cents,
            total_capacity: u32::try_from(self.total_capacity)?,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            is_featured: self.is_featured,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    trip_id: Uuid,
    requester_id: String,
    number_of_people: i32,
    total_price_cents: i64,
    status: String,
    contact_email: String,
    contact_phone: Option<String>,
    special_requests: Option<String>,
    reservation_id: Uuid,
    reservation_seats: i32,
    confirmation_date: Option<DateTime<Utc>>,
    cancellation_date: Option<DateTime<Utc>>,
    status_changed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Booking {
            id: self.id,
            trip_id: self.trip_id,
            requester_id: self.requester_id,
            number_of_people: u32::try_from(self.number_of_people)?,
            total_price_cents: self.total_price_cents,
            status: BookingStatus::from_str(&self.status)?,
            contact: ContactInfo {
                email: Redacted::new(self.contact_email),
                phone: self.contact_phone.map(Redacted::new),
            },
            special_requests: self.special_requests,
            reservation: ReservationToken::from_parts(
                self.reservation_id,
                self.trip_id,
                u32::try_from(self.reservation_seats)?,
            ),
            confirmation_date: self.confirmation_date,
            cancellation_date: self.cancellation_date,
            status_changed_at: self.status_changed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    booking_id: Uuid,
    previous_status: Option<String>,
    new_status: String,
    actor_id: String,
    reason: Option<String>,
    changed_at: DateTime<Utc>,
}

impl HistoryRow {
    fn into_record(self) -> Result<HistoryRecord, Box<dyn std::error::Error + Send + Sync>> {
        let previous_status = match self.previous_status {
            Some(s) => Some(BookingStatus::from_str(&s)?),
            None => None,
        };
        Ok(HistoryRecord {
            id: self.id,
            booking_id: self.booking_id,
            previous_status,
            new_status: BookingStatus::from_str(&self.new_status)?,
            actor_id: self.actor_id,
            reason: self.reason,
            changed_at: self.changed_at,
        })
    }
}

#[async_trait]
impl TripRepository for PgTripCatalog {
    async fn fetch_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, TripRow>(
            r#"
            SELECT id, title, destination_id, description, trip_type, duration_days,
                   price_cents, total_capacity, start_date, end_date, is_active,
                   is_featured, created_at, updated_at
            FROM trips WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TripRow::into_trip).transpose()
    }
}

#[async_trait]
impl BookingRepository for PgBookingStore {
    async fn insert_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, trip_id, requester_id, number_of_people,
                total_price_cents, status, contact_email, contact_phone,
                special_requests, reservation_id, reservation_seats,
                confirmation_date, cancellation_date, status_changed_at,
                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(booking.id)
        .bind(booking.trip_id)
        .bind(&booking.requester_id)
        .bind(booking.number_of_people as i32)
        .bind(booking.total_price_cents)
        .bind(booking.status.as_str())
        .bind(booking.contact.email.expose())
        .bind(booking.contact.phone.as_ref().map(|p| p.expose().clone()))
        .bind(&booking.special_requests)
        .bind(booking.reservation.id())
        .bind(booking.reservation.seats() as i32)
        .bind(booking.confirmation_date)
        .bind(booking.cancellation_date)
        .bind(booking.status_changed_at)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_booking(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn update_booking(
        &self,
        booking: &Booking,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Only lifecycle fields change after creation; the party size and
        // the reservation are fixed.
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $1, confirmation_date = $2, cancellation_date = $3,
                status_changed_at = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(booking.status.as_str())
        .bind(booking.confirmation_date)
        .bind(booking.cancellation_date)
        .bind(booking.status_changed_at)
        .bind(booking.updated_at)
        .bind(booking.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("booking not present: {}", booking.id).into());
        }
        Ok(())
    }

    async fn list_for_requester(
        &self,
        requester_id: &str,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE requester_id = $1 ORDER BY created_at DESC",
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn list_with_status(
        &self,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT * FROM bookings WHERE status = ANY($1) ORDER BY created_at ASC",
        )
        .bind(&statuses)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryStore {
    async fn append(
        &self,
        record: &HistoryRecord,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO booking_history (id, booking_id, previous_status, new_status,
                actor_id, reason, changed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.booking_id)
        .bind(record.previous_status.map(|s| s.as_str()))
        .bind(record.new_status.as_str())
        .bind(&record.actor_id)
        .bind(&record.reason)
        .bind(record.changed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn history_for(
        &self,
        booking_id: Uuid,
    ) -> Result<Vec<HistoryRecord>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT * FROM booking_history WHERE booking_id = $1 ORDER BY changed_at ASC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(HistoryRow::into_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_row_conversion() {
        let now = Utc::now();
        let trip_id = Uuid::new_v4();
        let row = BookingRow {
            id: Uuid::new_v4(),
            trip_id,
            requester_id: "user-1".to_string(),
            number_of_people: 3,
            total_price_cents: 540_000,
            status: "CONFIRMED".to_string(),
            contact_email: "traveler@example.com".to_string(),
            contact_phone: None,
            special_requests: Some("window seats".to_string()),
            reservation_id: Uuid::new_v4(),
            reservation_seats: 3,
            confirmation_date: Some(now),
            cancellation_date: None,
            status_changed_at: now,
            created_at: now,
            updated_at: now,
        };

        let booking = row.into_booking().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.number_of_people, 3);
        assert_eq!(booking.reservation.trip_id(), trip_id);
        assert_eq!(booking.reservation.seats(), 3);
        assert_eq!(booking.contact.email.expose(), "traveler@example.com");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let now = Utc::now();
        let row = BookingRow {
            id: Uuid::new_v4(),
            trip_id: Uuid::new_v4(),
            requester_id: "user-1".to_string(),
            number_of_people: 1,
            total_price_cents: 100,
            status: "ON_HOLD".to_string(),
            contact_email: "traveler@example.com".to_string(),
            contact_phone: None,
            special_requests: None,
            reservation_id: Uuid::new_v4(),
            reservation_seats: 1,
            confirmation_date: None,
            cancellation_date: None,
            status_changed_at: now,
            created_at: now,
            updated_at: now,
        };

        assert!(row.into_booking().is_err());
    }

    #[test]
    fn test_history_row_conversion() {
        let row = HistoryRow {
            id: Uuid::new_v4(),
            booking_id: Uuid::new_v4(),
            previous_status: Some("PENDING".to_string()),
            new_status: "CONFIRMED".to_string(),
            actor_id: "user-1".to_string(),
            reason: None,
            changed_at: Utc::now(),
        };

        let record = row.into_record().unwrap();
        assert_eq!(record.previous_status, Some(BookingStatus::Pending));
        assert_eq!(record.new_status, BookingStatus::Confirmed);
    }
}
