use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use voyago_shared::BookingEvent;

/// Delivery seam for booking notifications. Implementations own the
/// transport (mail, message bus); the booking engine only guarantees the
/// call happens after the corresponding state change is durable, not that
/// delivery succeeds.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        event: &BookingEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Records events instead of delivering them. Optionally rejects a single
/// recipient to exercise failure paths.
#[derive(Default)]
pub struct MockNotificationDispatcher {
    delivered: Mutex<Vec<BookingEvent>>,
    reject_recipient: Option<String>,
}

impl MockNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dispatch to this recipient fails; everything else is recorded.
    pub fn rejecting(recipient: impl Into<String>) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            reject_recipient: Some(recipient.into()),
        }
    }

    pub fn delivered(&self) -> Vec<BookingEvent> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NotificationDispatcher for MockNotificationDispatcher {
    async fn dispatch(
        &self,
        event: &BookingEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.reject_recipient.as_deref() == Some(event.recipient.as_str()) {
            return Err("simulated delivery failure".into());
        }

        tracing::info!(
            booking_id = %event.booking_id,
            kind = event.kind.as_str(),
            "mock notification delivered"
        );
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use voyago_shared::BookingEventKind;

    #[tokio::test]
    async fn test_mock_records_deliveries() {
        let dispatcher = MockNotificationDispatcher::new();
        let event = BookingEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BookingEventKind::Created,
            "traveler@example.com".to_string(),
        );

        dispatcher.dispatch(&event).await.unwrap();
        assert_eq!(dispatcher.delivered(), vec![event]);
    }

    #[tokio::test]
    async fn test_mock_rejects_configured_recipient() {
        let dispatcher = MockNotificationDispatcher::rejecting("bounce@example.com");
        let event = BookingEvent::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BookingEventKind::Confirmed,
            "bounce@example.com".to_string(),
        );

        assert!(dispatcher.dispatch(&event).await.is_err());
        assert!(dispatcher.delivered().is_empty());
    }
}
