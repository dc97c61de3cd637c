//! Connectivity monitor: the single source of truth for online/offline.
//!
//! Passive by design: it only records the state and fans transitions out to
//! subscribers. Whoever feeds it (the sync worker's probe, a platform hook)
//! decides when the network changed; whoever subscribes decides what to do.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

pub use crate::types::ConnectivityState;

#[derive(Debug)]
struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ConnectivityState>,
}

#[derive(Debug)]
struct Inner {
    // State and subscriber list share one lock so every subscriber sees
    // transitions in the order they happened.
    shared: Mutex<Shared>,
    next_id: AtomicU64,
}

#[derive(Debug)]
struct Shared {
    state: ConnectivityState,
    subscribers: Vec<Subscriber>,
}

/// Observable online/offline signal.
///
/// Cheap to clone; all clones share the same state and subscribers.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// Create a monitor seeded with the runtime's current connectivity.
    pub fn new(initial: ConnectivityState) -> Self {
        Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(Shared {
                    state: initial,
                    subscribers: Vec::new(),
                }),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.lock().state
    }

    pub fn is_online(&self) -> bool {
        self.state() == ConnectivityState::Online
    }

    pub fn is_offline(&self) -> bool {
        self.state() == ConnectivityState::Offline
    }

    /// Record the current state.
    ///
    /// Returns `true` if this was a transition. Repeating the current state is
    /// a no-op and notifies nobody.
    pub fn set_state(&self, next: ConnectivityState) -> bool {
        let mut shared = self.lock();
        if shared.state == next {
            return false;
        }

        let previous = shared.state;
        shared.state = next;
        // Drop any dead subscribers while publishing.
        shared.subscribers.retain(|sub| sub.tx.send(next).is_ok());
        drop(shared);

        tracing::info!(from = %previous, to = %next, "connectivity changed");
        true
    }

    /// Mark the device as online.
    pub fn set_online(&self) -> bool {
        self.set_state(ConnectivityState::Online)
    }

    /// Mark the device as offline.
    pub fn set_offline(&self) -> bool {
        self.set_state(ConnectivityState::Offline)
    }

    /// Start receiving transitions. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> ConnectivitySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().subscribers.push(Subscriber { id, tx });

        ConnectivitySubscription {
            id,
            rx,
            monitor: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        lock_shared(&self.inner)
    }
}

// The guarded data is a plain enum and a Vec; a panic elsewhere cannot leave
// it half-updated, so a poisoned lock is still safe to use.
fn lock_shared(inner: &Inner) -> std::sync::MutexGuard<'_, Shared> {
    inner
        .shared
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A live subscription to connectivity transitions.
///
/// Each transition is delivered once, in order. Deregisters itself on drop.
#[derive(Debug)]
pub struct ConnectivitySubscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<ConnectivityState>,
    monitor: Weak<Inner>,
}

impl ConnectivitySubscription {
    /// Wait for the next transition. `None` once the monitor is gone.
    pub async fn recv(&mut self) -> Option<ConnectivityState> {
        self.rx.recv().await
    }

    /// Take the next transition if one is already waiting.
    pub fn try_recv(&mut self) -> Option<ConnectivityState> {
        self.rx.try_recv().ok()
    }

    /// Stop receiving transitions.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ConnectivitySubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.monitor.upgrade() {
            lock_shared(&inner).subscribers.retain(|sub| sub.id != self.id);
        }
    }
}
