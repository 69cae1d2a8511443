use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use candela_types::CorrectionEvent;

type Listener = dyn Fn(&CorrectionEvent) + Send + Sync;

struct Entry {
    id: u64,
    listener: Weak<Listener>,
}

/// Topics carried by the bus. Only corrections exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Topic {
    /// Bar correction notifications.
    Correction,
}

/// Synchronous in-process fan-out of correction events.
///
/// Listeners are invoked sequentially in registration order; a panicking
/// listener is isolated and logged so subsequent listeners still run and the
/// originating write completes. The bus holds weak references: dropping the
/// [`Subscription`] removes the listener.
#[derive(Default)]
pub struct EventBus {
    corrections: Arc<Mutex<Vec<Entry>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// A bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn list(&self, topic: Topic) -> &Arc<Mutex<Vec<Entry>>> {
        match topic {
            Topic::Correction => &self.corrections,
        }
    }

    /// Register a listener; the returned guard unsubscribes on drop.
    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> Subscription
    where
        F: Fn(&CorrectionEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let strong: Arc<Listener> = Arc::new(listener);
        let list = self.list(topic);
        if let Ok(mut guard) = list.lock() {
            guard.push(Entry {
                id,
                listener: Arc::downgrade(&strong),
            });
        }
        Subscription {
            _listener: strong,
            id,
            list: Arc::downgrade(list),
        }
    }

    /// Deliver an event to every live listener, in registration order.
    pub fn publish(&self, topic: Topic, event: &CorrectionEvent) {
        let callbacks: Vec<Arc<Listener>> = {
            let Ok(mut guard) = self.list(topic).lock() else {
                return;
            };
            guard.retain(|e| e.listener.strong_count() > 0);
            guard.iter().filter_map(|e| e.listener.upgrade()).collect()
        };
        for cb in callbacks {
            if catch_unwind(AssertUnwindSafe(|| cb(event))).is_err() {
                tracing::warn!(
                    target = "candela::bus",
                    event = "listener_panic",
                    symbol = %event.symbol,
                    ts = event.ts,
                    "correction listener panicked; continuing fan-out"
                );
            }
        }
    }

    /// Number of live listeners on a topic.
    #[must_use]
    pub fn listener_count(&self, topic: Topic) -> usize {
        self.list(topic).lock().map_or(0, |guard| {
            guard.iter().filter(|e| e.listener.strong_count() > 0).count()
        })
    }

    /// Drop every listener on a topic.
    pub fn remove_all(&self, topic: Topic) {
        if let Ok(mut guard) = self.list(topic).lock() {
            guard.clear();
        }
    }
}

/// Keeps a listener alive; dropping it unsubscribes.
pub struct Subscription {
    _listener: Arc<Listener>,
    id: u64,
    list: Weak<Mutex<Vec<Entry>>>,
}

impl Subscription {
    /// Explicitly remove the listener. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade()
            && let Ok(mut guard) = list.lock()
        {
            guard.retain(|e| e.id != self.id);
        }
    }
}
