use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::warn;
use voyago_core::NotificationDispatcher;
use voyago_shared::BookingEvent;

/// Post-commit notification queue.
///
/// Events are enqueued only after the corresponding state change is
/// durable, then flushed best-effort: a failed dispatch stays queued for
/// the next flush instead of rolling anything back or disappearing.
#[derive(Default)]
pub struct NotificationOutbox {
    pending: Mutex<VecDeque<BookingEvent>>,
}

impl NotificationOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, event: BookingEvent) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Attempts delivery of queued events in order; stops at the first
    /// failure to preserve ordering. Returns how many were delivered.
    pub async fn flush(&self, dispatcher: &dyn NotificationDispatcher) -> usize {
        let mut delivered = 0;
        loop {
            let Some(event) = self.pop_front() else {
                break;
            };
            match dispatcher.dispatch(&event).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(
                        booking_id = %event.booking_id,
                        kind = event.kind.as_str(),
                        "notification dispatch failed, event kept for retry: {}",
                        err
                    );
                    self.push_front(event);
                    break;
                }
            }
        }
        delivered
    }

    fn pop_front(&self) -> Option<BookingEvent> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn push_front(&self, event: BookingEvent) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use voyago_core::MockNotificationDispatcher;
    use voyago_shared::BookingEventKind;

    fn event(kind: BookingEventKind, recipient: &str) -> BookingEvent {
        BookingEvent::new(Uuid::new_v4(), Uuid::new_v4(), kind, recipient.to_string())
    }

    #[tokio::test]
    async fn test_flush_delivers_in_order() {
        let outbox = NotificationOutbox::new();
        let dispatcher = MockNotificationDispatcher::new();

        outbox.enqueue(event(BookingEventKind::Created, "a@example.com"));
        outbox.enqueue(event(BookingEventKind::Confirmed, "a@example.com"));

        let delivered = outbox.flush(&dispatcher).await;
        assert_eq!(delivered, 2);
        assert_eq!(outbox.pending_count(), 0);

        let kinds: Vec<BookingEventKind> =
            dispatcher.delivered().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![BookingEventKind::Created, BookingEventKind::Confirmed]
        );
    }

    #[tokio::test]
    async fn test_failed_dispatch_keeps_event_queued() {
        let outbox = NotificationOutbox::new();
        let rejecting = MockNotificationDispatcher::rejecting("bounce@example.com");

        outbox.enqueue(event(BookingEventKind::Created, "bounce@example.com"));
        outbox.enqueue(event(BookingEventKind::Confirmed, "fine@example.com"));

        // First flush stalls on the rejected recipient; nothing is lost.
        assert_eq!(outbox.flush(&rejecting).await, 0);
        assert_eq!(outbox.pending_count(), 2);

        // A healthy dispatcher drains the queue in the original order.
        let dispatcher = MockNotificationDispatcher::new();
        assert_eq!(outbox.flush(&dispatcher).await, 2);
        assert_eq!(outbox.pending_count(), 0);
        assert_eq!(dispatcher.delivered()[0].kind, BookingEventKind::Created);
    }
}
