use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Opaque handle to one seat reservation. Commit and release go through
/// the token, which lets the ledger keep release idempotent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservationToken {
    id: Uuid,
    trip_id: Uuid,
    seats: u32,
}

impl ReservationToken {
    /// Rebuilds a token from persisted booking columns. Only the storage
    /// layer has a reason to call this.
    pub fn from_parts(id: Uuid, trip_id: Uuid, seats: u32) -> Self {
        Self { id, trip_id, seats }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    pub fn seats(&self) -> u32 {
        self.seats
    }
}

/// Point-in-time view of one trip's counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacitySnapshot {
    pub total_capacity: u32,
    pub held: u32,
    pub confirmed: u32,
}

impl CapacitySnapshot {
    pub fn available(&self) -> u32 {
        self.total_capacity - self.held - self.confirmed
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("Trip not registered in capacity ledger: {0}")]
    TripNotRegistered(Uuid),

    #[error("Capacity exceeded: requested {requested}, available {available}")]
    Exhausted { requested: u32, available: u32 },

    #[error("Reservation token is not holding seats: {0}")]
    TokenNotHeld(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    Held,
    Committed,
}

#[derive(Debug)]
struct LedgerEntry {
    total_capacity: u32,
    held: u32,
    confirmed: u32,
    // Outstanding tokens only; released tokens are removed, so a second
    // release of the same token finds nothing and does nothing.
    tokens: HashMap<Uuid, (TokenState, u32)>,
}

impl LedgerEntry {
    fn available(&self) -> u32 {
        self.total_capacity - self.held - self.confirmed
    }

    fn snapshot(&self) -> CapacitySnapshot {
        CapacitySnapshot {
            total_capacity: self.total_capacity,
            held: self.held,
            confirmed: self.confirmed,
        }
    }
}

/// Tracks held and confirmed seats per trip and guarantees
/// `held + confirmed <= total_capacity` at all times.
///
/// Entries live in an arena keyed by trip id, each behind its own lock, so
/// reservations on different trips never contend. The remaining-capacity
/// check and the held-seat increment happen inside a single critical
/// section; a request that arrives after capacity is exhausted fails
/// immediately instead of queueing.
pub struct CapacityLedger {
    entries: RwLock<HashMap<Uuid, Arc<Mutex<LedgerEntry>>>>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a trip's counters. Idempotent: an existing entry keeps its
    /// counters untouched.
    pub fn ensure_trip(&self, trip_id: Uuid, total_capacity: u32) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.entry(trip_id).or_insert_with(|| {
            Arc::new(Mutex::new(LedgerEntry {
                total_capacity,
                held: 0,
                confirmed: 0,
                tokens: HashMap::new(),
            }))
        });
    }

    fn entry(&self, trip_id: Uuid) -> Option<Arc<Mutex<LedgerEntry>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&trip_id).cloned()
    }

    fn lock(entry: &Mutex<LedgerEntry>) -> MutexGuard<'_, LedgerEntry> {
        // Counters stay usable even if a holder panicked mid-update.
        entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Places a hold on `seats` seats. Fails fast with `Exhausted` when the
    /// remaining capacity cannot cover the request.
    pub fn reserve(&self, trip_id: Uuid, seats: u32) -> Result<ReservationToken, CapacityError> {
        let entry = self
            .entry(trip_id)
            .ok_or(CapacityError::TripNotRegistered(trip_id))?;
        let mut entry = Self::lock(&entry);

        let available = entry.available();
        if seats > available {
            return Err(CapacityError::Exhausted {
                requested: seats,
                available,
            });
        }

        entry.held += seats;
        let token = ReservationToken {
            id: Uuid::new_v4(),
            trip_id,
            seats,
        };
        entry.tokens.insert(token.id, (TokenState::Held, seats));
        debug!(%trip_id, seats, held = entry.held, "seats held");
        Ok(token)
    }

    /// Reclassifies a hold as confirmed. The total reserved count is
    /// unchanged, so this can never fail on capacity grounds. Committing an
    /// already-committed token is a no-op, which keeps a retried
    /// confirmation safe.
    pub fn commit(&self, token: &ReservationToken) -> Result<(), CapacityError> {
        let entry = self
            .entry(token.trip_id)
            .ok_or(CapacityError::TripNotRegistered(token.trip_id))?;
        let mut entry = Self::lock(&entry);

        let seats = match entry.tokens.get_mut(&token.id) {
            Some((TokenState::Committed, _)) => return Ok(()),
            Some(slot) => {
                slot.0 = TokenState::Committed;
                slot.1
            }
            None => return Err(CapacityError::TokenNotHeld(token.id)),
        };

        entry.held -= seats;
        entry.confirmed += seats;
        debug!(trip_id = %token.trip_id, seats, confirmed = entry.confirmed, "hold committed");
        Ok(())
    }

    /// Returns a reservation's seats to the pool: held seats for a held
    /// token, confirmed seats for a committed one. Idempotent and
    /// infallible, so it is always safe to call during failure cleanup.
    pub fn release(&self, token: &ReservationToken) {
        let Some(entry) = self.entry(token.trip_id) else {
            return;
        };
        let mut entry = Self::lock(&entry);

        match entry.tokens.remove(&token.id) {
            Some((TokenState::Held, seats)) => {
                entry.held -= seats;
                debug!(trip_id = %token.trip_id, seats, "hold released");
            }
            Some((TokenState::Committed, seats)) => {
                entry.confirmed -= seats;
                debug!(trip_id = %token.trip_id, seats, "confirmed seats released");
            }
            None => {}
        }
    }

    /// Re-adopts a persisted pending reservation after a restart. The
    /// counters are derived state; bookings are the source of truth.
    pub fn adopt_held(&self, token: &ReservationToken) {
        self.adopt(token, TokenState::Held);
    }

    /// Re-adopts a persisted confirmed reservation after a restart.
    pub fn adopt_committed(&self, token: &ReservationToken) {
        self.adopt(token, TokenState::Committed);
    }

    fn adopt(&self, token: &ReservationToken, state: TokenState) {
        let Some(entry) = self.entry(token.trip_id) else {
            return;
        };
        let mut entry = Self::lock(&entry);
        if entry.tokens.contains_key(&token.id) {
            return;
        }

        entry.tokens.insert(token.id, (state, token.seats));
        match state {
            TokenState::Held => entry.held += token.seats,
            TokenState::Committed => entry.confirmed += token.seats,
        }
    }

    pub fn snapshot(&self, trip_id: Uuid) -> Option<CapacitySnapshot> {
        let entry = self.entry(trip_id)?;
        let entry = Self::lock(&entry);
        Some(entry.snapshot())
    }

    pub fn available(&self, trip_id: Uuid) -> Option<u32> {
        self.snapshot(trip_id).map(|s| s.available())
    }
}

impl Default for CapacityLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ledger_with_trip(capacity: u32) -> (CapacityLedger, Uuid) {
        let ledger = CapacityLedger::new();
        let trip_id = Uuid::new_v4();
        ledger.ensure_trip(trip_id, capacity);
        (ledger, trip_id)
    }

    #[test]
    fn test_reserve_commit_release_lifecycle() {
        let (ledger, trip_id) = ledger_with_trip(10);

        let token = ledger.reserve(trip_id, 4).unwrap();
        assert_eq!(
            ledger.snapshot(trip_id).unwrap(),
            CapacitySnapshot {
                total_capacity: 10,
                held: 4,
                confirmed: 0
            }
        );

        ledger.commit(&token).unwrap();
        assert_eq!(
            ledger.snapshot(trip_id).unwrap(),
            CapacitySnapshot {
                total_capacity: 10,
                held: 0,
                confirmed: 4
            }
        );

        ledger.release(&token);
        assert_eq!(ledger.available(trip_id), Some(10));
    }

    #[test]
    fn test_reserve_fails_when_capacity_exhausted() {
        let (ledger, trip_id) = ledger_with_trip(3);

        ledger.reserve(trip_id, 2).unwrap();
        let err = ledger.reserve(trip_id, 2).unwrap_err();
        assert_eq!(
            err,
            CapacityError::Exhausted {
                requested: 2,
                available: 1
            }
        );

        // The failed attempt must not leak seats.
        assert_eq!(ledger.available(trip_id), Some(1));
    }

    #[test]
    fn test_reserve_then_release_round_trips() {
        let (ledger, trip_id) = ledger_with_trip(8);
        let before = ledger.snapshot(trip_id).unwrap();

        let token = ledger.reserve(trip_id, 5).unwrap();
        ledger.release(&token);

        assert_eq!(ledger.snapshot(trip_id).unwrap(), before);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (ledger, trip_id) = ledger_with_trip(5);

        let token = ledger.reserve(trip_id, 3).unwrap();
        ledger.release(&token);
        ledger.release(&token);

        assert_eq!(ledger.available(trip_id), Some(5));
    }

    #[test]
    fn test_commit_requires_outstanding_token() {
        let (ledger, trip_id) = ledger_with_trip(5);

        let token = ledger.reserve(trip_id, 2).unwrap();
        ledger.release(&token);

        assert_eq!(
            ledger.commit(&token),
            Err(CapacityError::TokenNotHeld(token.id()))
        );
        assert_eq!(ledger.available(trip_id), Some(5));
    }

    #[test]
    fn test_commit_is_idempotent() {
        let (ledger, trip_id) = ledger_with_trip(5);

        let token = ledger.reserve(trip_id, 2).unwrap();
        ledger.commit(&token).unwrap();
        ledger.commit(&token).unwrap();

        assert_eq!(
            ledger.snapshot(trip_id).unwrap(),
            CapacitySnapshot {
                total_capacity: 5,
                held: 0,
                confirmed: 2
            }
        );
    }

    #[test]
    fn test_unregistered_trip_is_rejected() {
        let ledger = CapacityLedger::new();
        let trip_id = Uuid::new_v4();

        assert_eq!(
            ledger.reserve(trip_id, 1),
            Err(CapacityError::TripNotRegistered(trip_id))
        );
        assert!(ledger.snapshot(trip_id).is_none());
    }

    #[test]
    fn test_ensure_trip_keeps_existing_counters() {
        let (ledger, trip_id) = ledger_with_trip(10);
        ledger.reserve(trip_id, 6).unwrap();

        ledger.ensure_trip(trip_id, 10);
        assert_eq!(ledger.available(trip_id), Some(4));
    }

    #[test]
    fn test_adopt_rebuilds_counters_once() {
        let (ledger, trip_id) = ledger_with_trip(10);
        let held = ReservationToken::from_parts(Uuid::new_v4(), trip_id, 3);
        let committed = ReservationToken::from_parts(Uuid::new_v4(), trip_id, 4);

        ledger.adopt_held(&held);
        ledger.adopt_committed(&committed);
        // Adopting the same token twice must not double-count.
        ledger.adopt_held(&held);

        assert_eq!(
            ledger.snapshot(trip_id).unwrap(),
            CapacitySnapshot {
                total_capacity: 10,
                held: 3,
                confirmed: 4
            }
        );
    }

    #[test]
    fn test_concurrent_reserves_never_overcommit() {
        let ledger = Arc::new(CapacityLedger::new());
        let trip_id = Uuid::new_v4();
        ledger.ensure_trip(trip_id, 10);

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.reserve(trip_id, 1).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|reserved| *reserved)
            .count();

        assert_eq!(successes, 10);
        let snapshot = ledger.snapshot(trip_id).unwrap();
        assert_eq!(snapshot.held, 10);
        assert_eq!(snapshot.available(), 0);
        assert!(snapshot.held + snapshot.confirmed <= snapshot.total_capacity);
    }
}
