//! Cache event system.
//!
//! Every state transition of a cache entry is published as a `CacheEvent`
//! on a broadcast channel. Subscriptions listen for their key; anything else
//! (logging, a UI binding) may listen too.

use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use super::keys::CacheKey;
use super::store::EntryStatus;

/// Monotonic epoch for ordering events.
///
/// Each event gets a unique, monotonically increasing epoch number, so a
/// listener can tell which of two notifications for the same key is newer.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: EventKind,
    pub timestamp: OffsetDateTime,
}

impl CacheEvent {
    pub fn new(kind: EventKind, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Key the event concerns, if any.
    pub fn key(&self) -> Option<&CacheKey> {
        match &self.kind {
            EventKind::EntryChanged { key, .. } | EventKind::Evicted { key } => Some(key),
            EventKind::SessionChanged { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// An entry moved to a new status (fetch started, settled, invalidated
    /// or reset).
    EntryChanged { key: CacheKey, status: EntryStatus },
    /// An idle entry was garbage collected.
    Evicted { key: CacheKey },
    /// The active session was replaced or cleared.
    SessionChanged { user_id: Option<String> },
}

/// Broadcast bus for cache events.
///
/// Publishing never blocks; slow listeners lag and skip ahead.
pub struct EventBus {
    sender: broadcast::Sender<CacheEvent>,
    epoch_counter: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish an event to every current listener.
    pub fn publish(&self, kind: EventKind) -> Epoch {
        let epoch = self.next_epoch();
        let event = CacheEvent::new(kind, epoch);

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            event_kind = ?event.kind,
            "Cache event published"
        );

        // No listeners is fine: nothing is rendering this key.
        let _ = self.sender.send(event);
        epoch
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(super::config::DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::ResourceKind;

    fn key() -> CacheKey {
        CacheKey::new(ResourceKind::Product, "top", Vec::<String>::new())
    }

    #[test]
    fn event_creation() {
        let kind = EventKind::Evicted { key: key() };
        let event = CacheEvent::new(kind.clone(), 42);

        assert_eq!(event.epoch, 42);
        assert_eq!(event.kind, kind);
        assert!(!event.id.is_nil());
        assert_eq!(event.key(), Some(&key()));
    }

    #[test]
    fn epoch_monotonicity() {
        let bus = EventBus::new(8);

        let e1 = bus.next_epoch();
        let e2 = bus.next_epoch();
        let e3 = bus.next_epoch();

        assert!(e1 < e2);
        assert!(e2 < e3);
    }

    #[test]
    fn publish_without_listeners_is_harmless() {
        let bus = EventBus::new(8);
        assert_eq!(bus.listener_count(), 0);
        bus.publish(EventKind::SessionChanged { user_id: None });
    }

    #[tokio::test]
    async fn listeners_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(EventKind::EntryChanged {
            key: key(),
            status: EntryStatus::Loading,
        });
        bus.publish(EventKind::EntryChanged {
            key: key(),
            status: EntryStatus::Fresh,
        });

        let first = rx.recv().await.expect("first event");
        let second = rx.recv().await.expect("second event");
        assert!(first.epoch < second.epoch);
        assert_eq!(
            second.kind,
            EventKind::EntryChanged {
                key: key(),
                status: EntryStatus::Fresh
            }
        );
    }
}
