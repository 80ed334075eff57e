//! Listener registry.
//!
//! Replaces a process-wide message hook with explicit subscriptions: each
//! `subscribe` returns a `Subscription` that detaches its listener on
//! `unsubscribe` or drop, so several hubs or test harnesses can share one bus.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use super::port::MessageEvent;

type Listener = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

#[derive(Default)]
pub struct MessageBus {
    listeners: DashMap<u64, Listener>,
    seq: AtomicU64,
}

impl MessageBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&MessageEvent) + Send + Sync + 'static,
    {
        let id = self.seq.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));
        Subscription {
            id,
            bus: Arc::downgrade(self),
        }
    }

    /// Run every listener, in subscription order, to completion. Returns the
    /// number of listeners invoked.
    pub fn deliver(&self, event: &MessageEvent) -> usize {
        // Snapshot first: listeners may subscribe/unsubscribe while running.
        let mut snapshot: Vec<(u64, Listener)> = self
            .listeners
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();
        snapshot.sort_by_key(|(id, _)| *id);

        for (_, listener) in &snapshot {
            listener(event);
        }
        snapshot.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn remove(&self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }
}

/// Handle to an installed listener.
#[must_use = "dropping a Subscription detaches its listener"]
pub struct Subscription {
    id: u64,
    bus: Weak<MessageBus>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .map(|bus| bus.listeners.contains_key(&self.id))
            .unwrap_or(false)
    }

    /// Detach the listener now.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
