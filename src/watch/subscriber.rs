//! Subscriber registry for change-batch delivery.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::ChangeBatch;

type Callback = Arc<dyn Fn(&ChangeBatch) + Send + Sync>;

/// Handle for a subscription that can be dropped to unsubscribe.
pub struct SubscriptionHandle {
    id: usize,
    registry: Arc<RwLock<SubscriberRegistryInner>>,
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        let mut inner = self.registry.write();
        inner.subscribers.retain(|(sub_id, _)| *sub_id != self.id);
    }
}

struct SubscriberRegistryInner {
    subscribers: Vec<(usize, Callback)>,
    next_id: usize,
}

/// Registry of change-batch consumers for one watcher.
///
/// Consumers (the pipeline and instance managers) subscribe once at startup
/// and receive every non-empty [`ChangeBatch`] their watcher produces, in
/// subscription order. Delivery happens on the watcher task after the
/// snapshot mutex has been released, so a callback that needs a consistent
/// cross-file view should take a scoped snapshot read of its own.
pub struct SubscriberRegistry {
    inner: Arc<RwLock<SubscriberRegistryInner>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(SubscriberRegistryInner {
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a callback for future change batches.
    ///
    /// Returns a handle that unsubscribes when dropped.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ChangeBatch) + Send + Sync + 'static,
    {
        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, Arc::new(callback)));

        SubscriptionHandle {
            id,
            registry: Arc::clone(&self.inner),
        }
    }

    /// Deliver `batch` to every subscriber, in subscription order.
    ///
    /// The registry lock is released before any callback runs, so a callback
    /// may subscribe or drop handles (including its own) without deadlocking.
    pub fn notify(&self, batch: &ChangeBatch) {
        let callbacks: Vec<Callback> = {
            let inner = self.inner.read();
            inner
                .subscribers
                .iter()
                .map(|(_id, callback)| Arc::clone(callback))
                .collect()
        };
        for callback in callbacks {
            callback(batch);
        }
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().subscribers.len()
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SubscriberRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
