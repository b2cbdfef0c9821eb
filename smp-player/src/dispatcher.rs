//! Event dispatcher
//!
//! Typed publish/subscribe hub for [`PlayerEvent`]s.
//!
//! # Architecture
//!
//! - **Callback registry**: subscribers register per [`EventKind`]; `publish`
//!   invokes them synchronously in subscription order
//! - **Broadcast mirror** (tokio::broadcast): every published event is also
//!   sent to channel receivers, for async consumers such as the console
//!
//! A subscriber that returns an error or panics is logged and skipped; the
//! remaining subscribers of that event still receive it.

use smp_common::events::{EventKind, PlayerEvent};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{error, trace, warn};

/// Error type subscribers may return
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by subscriber callbacks
pub type SubscriberResult = std::result::Result<(), SubscriberError>;

type Callback = Arc<dyn Fn(&PlayerEvent) -> SubscriberResult + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// Publish/subscribe hub keyed by event kind
pub struct EventDispatcher {
    subscribers: RwLock<HashMap<EventKind, Vec<Subscriber>>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher whose broadcast mirror buffers `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            tx,
        }
    }

    /// Register a callback for one event kind
    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&PlayerEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        self.register(&[kind], Arc::new(callback))
    }

    /// Register one callback for every event kind
    pub fn subscribe_all<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PlayerEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        self.register(&EventKind::ALL, Arc::new(callback))
    }

    fn register(&self, kinds: &[EventKind], callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        for kind in kinds {
            subscribers.entry(*kind).or_default().push(Subscriber {
                id,
                callback: Arc::clone(&callback),
            });
        }
        id
    }

    /// Remove a subscription from every kind it was registered for
    ///
    /// Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        for list in subscribers.values_mut() {
            let before = list.len();
            list.retain(|s| s.id != id);
            removed |= list.len() != before;
        }
        removed
    }

    /// Receiver for the broadcast mirror of all future events
    pub fn subscribe_channel(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver one event to its subscribers, then to the broadcast mirror
    ///
    /// The registry lock is released before callbacks run, so callbacks may
    /// subscribe or unsubscribe.
    pub fn publish(&self, event: PlayerEvent) {
        let kind = event.kind();
        let targets: Vec<Subscriber> = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        trace!("Publishing {} to {} subscribers", kind, targets.len());

        for subscriber in &targets {
            match catch_unwind(AssertUnwindSafe(|| (subscriber.callback)(&event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("{} subscriber {:?} failed: {}", kind, subscriber.id, e);
                }
                Err(_) => {
                    error!("{} subscriber {:?} panicked", kind, subscriber.id);
                }
            }
        }

        // No receivers is OK
        let _ = self.tx.send(event);
    }

    /// Deliver a batch in order
    pub fn publish_all(&self, events: impl IntoIterator<Item = PlayerEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(256)
    }
}
