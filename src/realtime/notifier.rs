//! Fire-and-forget change notification.
//!
//! Events fan out over a `tokio::sync::broadcast` channel. Publishing never
//! fails the operation that produced the event: a send with no subscribers
//! is dropped silently, and subscribers that lag past the channel capacity
//! miss events. Best-effort delivery, no guarantees.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use crate::observability::Logger;

use super::event::EntityEvent;

/// Default capacity of the event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcasts entity change events to any number of subscribers.
#[derive(Debug)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<EntityEvent>,
    sequence: AtomicU64,
}

impl ChangeNotifier {
    /// Creates a notifier with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribes to the event stream from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publishes an event, stamping its sequence number.
    ///
    /// Never returns an error: notification failure must not fail the
    /// operation that produced the event.
    pub fn publish(&self, mut event: EntityEvent) {
        event.sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        if self.tx.send(event).is_err() {
            // No subscribers; the event is dropped by design of the channel.
            Logger::debug("NOTIFY_DROPPED", &[("reason", "no subscribers")]);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::event::ChangeKind;

    fn event(kind: ChangeKind) -> EntityEvent {
        EntityEvent::new(kind, "user-pool", None, None, None)
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let notifier = ChangeNotifier::new(8);
        notifier.publish(event(ChangeKind::Created));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let notifier = ChangeNotifier::new(8);
        let mut rx = notifier.subscribe();

        notifier.publish(event(ChangeKind::Created));
        notifier.publish(event(ChangeKind::Consumed));

        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Created);
        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Consumed);
    }

    #[tokio::test]
    async fn test_sequence_numbers_are_monotonic() {
        let notifier = ChangeNotifier::new(8);
        let mut rx = notifier.subscribe();

        for _ in 0..3 {
            notifier.publish(event(ChangeKind::Updated));
        }

        let first = rx.recv().await.unwrap().sequence;
        let second = rx.recv().await.unwrap().sequence;
        let third = rx.recv().await.unwrap().sequence;
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_only_new_events() {
        let notifier = ChangeNotifier::new(8);
        notifier.publish(event(ChangeKind::Created));

        let mut rx = notifier.subscribe();
        notifier.publish(event(ChangeKind::Deleted));

        assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Deleted);
    }
}
