//! In-process event source for science events.
//!
//! Observers register with [`ScienceBus::subscribe`] and deregister with
//! [`ScienceBus::unsubscribe`]. Each subscription is a bounded mpsc channel;
//! once unsubscribed, its stream yields whatever is still buffered and then
//! ends.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::model::ScienceEvent;

/// Subscription identifier.
pub type SubscriptionId = u64;

#[derive(Debug, Default)]
struct Registry {
    next_id: SubscriptionId,
    subscribers: HashMap<SubscriptionId, mpsc::Sender<ScienceEvent>>,
}

/// Cloneable handle to a shared subscriber registry.
#[derive(Debug, Clone)]
pub struct ScienceBus {
    registry: Arc<Mutex<Registry>>,
    capacity: usize,
}

/// Receiving end of a bus subscription.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<ScienceEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn into_stream(self) -> ReceiverStream<ScienceEvent> {
        ReceiverStream::new(self.receiver)
    }
}

impl ScienceBus {
    /// `capacity` bounds each subscriber's channel (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            capacity: capacity.max(1),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // registry updates are single inserts/removes, a poisoned lock still holds a valid map
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, sender);
        debug!(id, "subscribed to science events");
        Subscription { id, receiver }
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry().subscribers.remove(&id).is_some();
        debug!(id, removed, "unsubscribed from science events");
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().subscribers.len()
    }

    /// Deliver `event` to every subscriber, waiting for channel capacity.
    ///
    /// Subscribers whose receiver has been dropped are removed.
    pub async fn publish(&self, event: ScienceEvent) {
        let subscribers: Vec<_> = self
            .registry()
            .subscribers
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        for (id, sender) in subscribers {
            if sender.send(event.clone()).await.is_err() {
                warn!(id, "subscriber went away, dropping it");
                self.registry().subscribers.remove(&id);
            }
        }
    }
}

impl Default for ScienceBus {
    fn default() -> Self {
        Self::new(16)
    }
}
