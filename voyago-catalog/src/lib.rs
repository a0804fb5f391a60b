pub mod capacity;
pub mod destination;
pub mod trip;

pub use capacity::{CapacityError, CapacityLedger, CapacitySnapshot, ReservationToken};
pub use destination::Destination;
pub use trip::{InMemoryTripCatalog, Trip, TripRepository, TripType};
