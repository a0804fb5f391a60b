pub mod identity;
pub mod notify;

pub use identity::Actor;
pub use notify::{MockNotificationDispatcher, NotificationDispatcher};
