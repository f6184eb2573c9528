//! Sync status snapshots and the subscriber registry

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

use crate::models::Timestamp;

/// Point-in-time view of the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    /// The one-time initial download is running
    pub is_initializing: bool,
    /// At least one sync operation is running
    pub is_syncing: bool,
    /// Initialization finished (successfully or not)
    pub is_ready: bool,
    /// Message of the most recent failed sync, cleared by the next success
    pub error: Option<String>,
    /// Time of the most recent successful sync in this process
    pub last_synced_at: Option<Timestamp>,
}

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe observer registry for [`SyncStatus`] changes
#[derive(Clone, Default)]
pub struct StatusBroadcaster {
    registry: Arc<Mutex<Registry>>,
}

impl StatusBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for every future notification
    pub fn subscribe(&self, listener: impl Fn(&SyncStatus) + Send + Sync + 'static) -> Subscription {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `status` to every current subscriber.
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe re-entrantly.
    pub fn notify(&self, status: &SyncStatus) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(status);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

/// Handle returned by [`StatusBroadcaster::subscribe`].
///
/// Dropping the handle keeps the listener registered.
#[must_use = "call unsubscribe() to stop receiving notifications"]
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving notifications. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry)
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}
