use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Observable state of the sync orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub syncing: bool,
    pub pending: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
}

type Listener = Arc<dyn Fn(&SyncStatus) + Send + Sync>;

#[derive(Default)]
struct Registry {
    status: SyncStatus,
    listeners: HashMap<u64, Listener>,
    next_id: u64,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the current status and pushes every change to listeners synchronously
#[derive(Default)]
pub(crate) struct StatusBroadcaster {
    registry: Arc<Mutex<Registry>>,
}

impl StatusBroadcaster {
    pub(crate) fn snapshot(&self) -> SyncStatus {
        lock(&self.registry).status.clone()
    }

    pub(crate) fn subscribe(&self, listener: Listener) -> Subscription {
        let (id, status) = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.insert(id, listener.clone());
            (id, registry.status.clone())
        };

        listener(&status);

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Apply `change` and publish the result to every listener
    pub(crate) fn update(&self, change: impl FnOnce(&mut SyncStatus)) {
        let (status, listeners) = {
            let mut registry = lock(&self.registry);
            change(&mut registry.status);
            let listeners: Vec<Listener> = registry.listeners.values().cloned().collect();
            (registry.status.clone(), listeners)
        };

        // Called outside the lock so listeners may subscribe or read status
        for listener in listeners {
            listener(&status);
        }
    }

    #[cfg(test)]
    pub(crate) fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it or calling [`Subscription::unsubscribe`] stops delivery.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.remove(&self.id);
        }
    }
}
