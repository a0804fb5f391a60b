use crate::lifecycle;
use crate::models::{Booking, BookingStatus, CreateBookingRequest, HistoryRecord};
use crate::outbox::NotificationOutbox;
use crate::repository::{BookingRepository, HistoryRepository};
use crate::{BookingError, BookingResult};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use voyago_catalog::{CapacityError, CapacityLedger, CapacitySnapshot, Trip, TripRepository};
use voyago_core::{Actor, NotificationDispatcher};
use voyago_shared::{BookingEvent, BookingEventKind};

/// Tunable booking behavior, usually loaded from configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingPolicy {
    /// Confirmed bookings may be cancelled until this many hours before
    /// the trip departs.
    #[serde(default = "default_cancellation_window_hours")]
    pub cancellation_window_hours: i64,
    /// Whether one requester may hold several active bookings on the same
    /// trip.
    #[serde(default)]
    pub allow_repeat_booking: bool,
    /// How many days ahead of departure trip reminders go out.
    #[serde(default = "default_reminder_days_before")]
    pub reminder_days_before: i64,
}

fn default_cancellation_window_hours() -> i64 {
    48
}

fn default_reminder_days_before() -> i64 {
    3
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            cancellation_window_hours: default_cancellation_window_hours(),
            allow_repeat_booking: false,
            reminder_days_before: default_reminder_days_before(),
        }
    }
}

/// Orchestrates the capacity ledger, the booking lifecycle, the audit
/// trail, and notification dispatch. Side effects always happen in the
/// same order: ledger mutation, state mutation, history append,
/// notification dispatch.
pub struct BookingService {
    ledger: Arc<CapacityLedger>,
    trips: Arc<dyn TripRepository>,
    bookings: Arc<dyn BookingRepository>,
    history: Arc<dyn HistoryRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    outbox: NotificationOutbox,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        ledger: Arc<CapacityLedger>,
        trips: Arc<dyn TripRepository>,
        bookings: Arc<dyn BookingRepository>,
        history: Arc<dyn HistoryRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            ledger,
            trips,
            bookings,
            history,
            dispatcher,
            outbox: NotificationOutbox::new(),
            policy,
        }
    }

    /// Reserves seats and creates a pending booking. Nothing is recorded
    /// when the reservation fails, and the reservation is handed back if
    /// any later step fails.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
        actor: &Actor,
    ) -> BookingResult<Booking> {
        if request.number_of_people == 0 {
            return Err(BookingError::InvalidPartySize);
        }

        let trip = self.fetch_trip(request.trip_id).await?;
        let today = Utc::now().date_naive();
        if !trip.can_book(today) {
            return Err(BookingError::TripNotBookable(trip.id));
        }
        if !self.policy.allow_repeat_booking {
            self.reject_duplicate(trip.id, &actor.id).await?;
        }

        self.ledger.ensure_trip(trip.id, trip.total_capacity);
        let token = match self.ledger.reserve(trip.id, request.number_of_people) {
            Ok(token) => token,
            Err(CapacityError::Exhausted {
                requested,
                available,
            }) => {
                return Err(BookingError::CapacityExceeded {
                    trip_id: trip.id,
                    requested,
                    available,
                })
            }
            Err(err) => return Err(BookingError::Internal(err.to_string())),
        };

        let booking = Booking::new(
            trip.id,
            actor.id.clone(),
            request.number_of_people,
            trip.price_cents * i64::from(request.number_of_people),
            request.contact,
            request.special_requests,
            token,
        );

        if let Err(err) = self.bookings.insert_booking(&booking).await {
            self.ledger.release(&token);
            return Err(BookingError::StorageUnavailable(err));
        }
        if let Err(err) = self.record_transition(&booking, None, actor, None).await {
            self.ledger.release(&token);
            return Err(err);
        }

        info!(
            booking_id = %booking.id,
            trip_id = %trip.id,
            seats = booking.number_of_people,
            "booking created"
        );
        self.notify(&booking, BookingEventKind::Created).await;
        Ok(booking)
    }

    /// Drives pending -> confirmed. The hold becomes confirmed seats
    /// before the booking row changes.
    pub async fn confirm_booking(&self, booking_id: Uuid, actor: &Actor) -> BookingResult<Booking> {
        let mut booking = self.fetch_booking(booking_id).await?;
        self.authorize(&booking, actor)?;
        lifecycle::validate_transition(booking.status, BookingStatus::Confirmed)?;

        if let Err(err) = self.ledger.commit(&booking.reservation) {
            return Err(BookingError::Internal(format!(
                "ledger rejected commit for booking {}: {}",
                booking.id, err
            )));
        }

        let previous = booking.status;
        booking.apply_status(BookingStatus::Confirmed);
        self.persist(&booking).await?;
        self.record_transition(&booking, Some(previous), actor, None)
            .await?;

        info!(booking_id = %booking.id, "booking confirmed");
        self.notify(&booking, BookingEventKind::Confirmed).await;
        Ok(booking)
    }

    /// Drives pending/confirmed -> cancelled and returns the seats to the
    /// pool. Pending bookings cancel unconditionally; confirmed ones only
    /// inside the cancellation window.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> BookingResult<Booking> {
        let mut booking = self.fetch_booking(booking_id).await?;
        self.authorize(&booking, actor)?;
        lifecycle::validate_transition(booking.status, BookingStatus::Cancelled)?;

        if booking.status == BookingStatus::Confirmed {
            let trip = self.fetch_trip(booking.trip_id).await?;
            let deadline =
                trip.starts_at() - Duration::hours(self.policy.cancellation_window_hours);
            if Utc::now() > deadline {
                return Err(BookingError::CancellationWindowClosed {
                    booking_id,
                    deadline,
                });
            }
        }

        self.ledger.release(&booking.reservation);
        let previous = booking.status;
        booking.apply_status(BookingStatus::Cancelled);
        self.persist(&booking).await?;
        self.record_transition(&booking, Some(previous), actor, reason)
            .await?;

        info!(booking_id = %booking.id, from = %previous, "booking cancelled");
        self.notify(&booking, BookingEventKind::Cancelled).await;
        Ok(booking)
    }

    /// Drives confirmed -> completed once the trip has ended. An operator
    /// action; seats stay on the confirmed count of a finished trip.
    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        actor: &Actor,
    ) -> BookingResult<Booking> {
        if !actor.is_staff {
            return Err(BookingError::Forbidden {
                actor_id: actor.id.clone(),
            });
        }

        let mut booking = self.fetch_booking(booking_id).await?;
        lifecycle::validate_transition(booking.status, BookingStatus::Completed)?;

        let trip = self.fetch_trip(booking.trip_id).await?;
        if !trip.is_past(Utc::now().date_naive()) {
            return Err(BookingError::TripNotEnded(booking_id));
        }

        let previous = booking.status;
        booking.apply_status(BookingStatus::Completed);
        self.persist(&booking).await?;
        self.record_transition(&booking, Some(previous), actor, None)
            .await?;

        info!(booking_id = %booking.id, "booking completed");
        Ok(booking)
    }

    /// Batch pass over active bookings of ended trips: confirmed ones are
    /// completed, stale pending ones are cancelled so their hold returns
    /// to the pool. Returns how many bookings were swept.
    pub async fn sweep_finished_trips(&self, actor: &Actor) -> BookingResult<usize> {
        if !actor.is_staff {
            return Err(BookingError::Forbidden {
                actor_id: actor.id.clone(),
            });
        }

        let active = self.list_status(&[BookingStatus::Pending, BookingStatus::Confirmed]).await?;
        let today = Utc::now().date_naive();
        let mut swept = 0;

        for booking in active {
            let trip = match self.trips.fetch_trip(booking.trip_id).await {
                Ok(Some(trip)) => trip,
                Ok(None) => {
                    warn!(booking_id = %booking.id, trip_id = %booking.trip_id, "trip missing during sweep");
                    continue;
                }
                Err(err) => return Err(BookingError::StorageUnavailable(err)),
            };
            if !trip.is_past(today) {
                continue;
            }

            let outcome = match booking.status {
                BookingStatus::Confirmed => self.complete_booking(booking.id, actor).await,
                BookingStatus::Pending => {
                    self.cancel_booking(
                        booking.id,
                        actor,
                        Some("trip ended before confirmation".to_string()),
                    )
                    .await
                }
                _ => continue,
            };

            match outcome {
                Ok(_) => swept += 1,
                Err(err) => warn!(booking_id = %booking.id, "sweep skipped booking: {}", err),
            }
        }

        Ok(swept)
    }

    /// Queues reminder notifications for confirmed bookings whose trip
    /// departs within the configured number of days.
    pub async fn send_trip_reminders(&self) -> BookingResult<usize> {
        let confirmed = self.list_status(&[BookingStatus::Confirmed]).await?;
        let today = Utc::now().date_naive();
        let mut queued = 0;

        for booking in confirmed {
            let Some(trip) = self
                .trips
                .fetch_trip(booking.trip_id)
                .await
                .map_err(BookingError::StorageUnavailable)?
            else {
                continue;
            };

            let days_until = (trip.start_date - today).num_days();
            if (0..=self.policy.reminder_days_before).contains(&days_until) {
                self.outbox.enqueue(BookingEvent::new(
                    booking.id,
                    booking.trip_id,
                    BookingEventKind::TripReminder,
                    booking.contact.email.expose().clone(),
                ));
                queued += 1;
            }
        }

        self.outbox.flush(self.dispatcher.as_ref()).await;
        Ok(queued)
    }

    /// Rebuilds the in-memory ledger from persisted active bookings, for
    /// use at process start. Returns how many reservations were adopted.
    pub async fn restore_ledger(&self) -> BookingResult<usize> {
        let active = self.list_status(&[BookingStatus::Pending, BookingStatus::Confirmed]).await?;
        let mut adopted = 0;

        for booking in &active {
            let Some(trip) = self
                .trips
                .fetch_trip(booking.trip_id)
                .await
                .map_err(BookingError::StorageUnavailable)?
            else {
                warn!(booking_id = %booking.id, trip_id = %booking.trip_id, "trip missing during ledger restore");
                continue;
            };

            self.ledger.ensure_trip(trip.id, trip.total_capacity);
            match booking.status {
                BookingStatus::Pending => self.ledger.adopt_held(&booking.reservation),
                BookingStatus::Confirmed => self.ledger.adopt_committed(&booking.reservation),
                _ => {}
            }
            adopted += 1;
        }

        Ok(adopted)
    }

    pub async fn get_booking(&self, booking_id: Uuid, actor: &Actor) -> BookingResult<Booking> {
        let booking = self.fetch_booking(booking_id).await?;
        self.authorize(&booking, actor)?;
        Ok(booking)
    }

    /// All of a requester's bookings, newest first.
    pub async fn list_for_requester(&self, requester_id: &str) -> BookingResult<Vec<Booking>> {
        self.bookings
            .list_for_requester(requester_id)
            .await
            .map_err(BookingError::StorageUnavailable)
    }

    /// Pending and confirmed bookings of a requester.
    pub async fn list_active(&self, requester_id: &str) -> BookingResult<Vec<Booking>> {
        let bookings = self.list_for_requester(requester_id).await?;
        Ok(bookings.into_iter().filter(Booking::is_active).collect())
    }

    /// Active bookings whose trip has not yet departed, soonest first.
    pub async fn list_upcoming(&self, requester_id: &str) -> BookingResult<Vec<Booking>> {
        let today = Utc::now().date_naive();
        let mut upcoming = Vec::new();
        for booking in self.list_active(requester_id).await? {
            let trip = self.fetch_trip(booking.trip_id).await?;
            if trip.start_date > today {
                upcoming.push((trip.start_date, booking));
            }
        }
        upcoming.sort_by_key(|(start, _)| *start);
        Ok(upcoming.into_iter().map(|(_, b)| b).collect())
    }

    /// Bookings whose trip already ended, most recent trip first.
    pub async fn list_past(&self, requester_id: &str) -> BookingResult<Vec<Booking>> {
        let today = Utc::now().date_naive();
        let mut past = Vec::new();
        for booking in self.list_for_requester(requester_id).await? {
            let trip = self.fetch_trip(booking.trip_id).await?;
            if trip.end_date < today {
                past.push((trip.end_date, booking));
            }
        }
        past.sort_by_key(|(end, _)| std::cmp::Reverse(*end));
        Ok(past.into_iter().map(|(_, b)| b).collect())
    }

    /// A booking's audit trail, oldest first.
    pub async fn history_for(&self, booking_id: Uuid) -> BookingResult<Vec<HistoryRecord>> {
        self.history
            .history_for(booking_id)
            .await
            .map_err(BookingError::StorageUnavailable)
    }

    pub fn capacity_for(&self, trip_id: Uuid) -> Option<CapacitySnapshot> {
        self.ledger.snapshot(trip_id)
    }

    /// Notifications still waiting for a successful dispatch.
    pub fn pending_notifications(&self) -> usize {
        self.outbox.pending_count()
    }

    async fn reject_duplicate(&self, trip_id: Uuid, requester_id: &str) -> BookingResult<()> {
        let existing = self.list_for_requester(requester_id).await?;
        if existing
            .iter()
            .any(|b| b.trip_id == trip_id && b.is_active())
        {
            return Err(BookingError::DuplicateBooking {
                trip_id,
                requester_id: requester_id.to_string(),
            });
        }
        Ok(())
    }

    fn authorize(&self, booking: &Booking, actor: &Actor) -> BookingResult<()> {
        if actor.can_manage(&booking.requester_id) {
            Ok(())
        } else {
            Err(BookingError::Forbidden {
                actor_id: actor.id.clone(),
            })
        }
    }

    async fn fetch_trip(&self, trip_id: Uuid) -> BookingResult<Trip> {
        self.trips
            .fetch_trip(trip_id)
            .await
            .map_err(BookingError::StorageUnavailable)?
            .ok_or(BookingError::TripNotFound(trip_id))
    }

    async fn fetch_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .fetch_booking(booking_id)
            .await
            .map_err(BookingError::StorageUnavailable)?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    async fn persist(&self, booking: &Booking) -> BookingResult<()> {
        self.bookings
            .update_booking(booking)
            .await
            .map_err(BookingError::StorageUnavailable)
    }

    async fn list_status(&self, statuses: &[BookingStatus]) -> BookingResult<Vec<Booking>> {
        self.bookings
            .list_with_status(statuses)
            .await
            .map_err(BookingError::StorageUnavailable)
    }

    async fn record_transition(
        &self,
        booking: &Booking,
        previous: Option<BookingStatus>,
        actor: &Actor,
        reason: Option<String>,
    ) -> BookingResult<()> {
        let record = HistoryRecord::new(booking.id, previous, booking.status, actor, reason);
        self.history
            .append(&record)
            .await
            .map_err(BookingError::StorageUnavailable)
    }

    async fn notify(&self, booking: &Booking, kind: BookingEventKind) {
        self.outbox.enqueue(BookingEvent::new(
            booking.id,
            booking.trip_id,
            kind,
            booking.contact.email.expose().clone(),
        ));
        self.outbox.flush(self.dispatcher.as_ref()).await;
    }
}
