pub mod events;
pub mod pii;

pub use events::{BookingEvent, BookingEventKind};
pub use pii::Redacted;
