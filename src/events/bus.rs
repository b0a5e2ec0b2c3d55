use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, RwLock, Weak},
};

use crate::events::types::{ConsentEvent, ConsentEventKind};

pub type ConsentListener = Arc<dyn Fn(&ConsentEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct BusState {
    next_id: u64,
    listeners: BTreeMap<ConsentEventKind, Vec<(ListenerId, ConsentListener)>>,
}

impl BusState {
    fn remove(&mut self, kind: ConsentEventKind, id: ListenerId) -> bool {
        let Some(listeners) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            self.listeners.remove(&kind);
        }
        removed
    }
}

/// Listener registry keyed by event kind.
///
/// Listeners of one kind run in subscription order. An emission works on a copy of the listener
/// list, so listeners may subscribe or unsubscribe from inside a callback; the change applies to
/// the next emission.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Arc<RwLock<BusState>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.state.read().expect("lock poisoned");
        let counts: BTreeMap<_, _> = guard
            .listeners
            .iter()
            .map(|(kind, listeners)| (kind.as_str(), listeners.len()))
            .collect();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: ConsentEventKind, listener: F) -> Subscription
    where
        F: Fn(&ConsentEvent) + Send + Sync + 'static,
    {
        let mut guard = self.state.write().expect("lock poisoned");
        let id = ListenerId(guard.next_id);
        guard.next_id = guard.next_id.saturating_add(1);
        guard
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            kind,
            id,
            bus: Arc::downgrade(&self.state),
        }
    }

    /// Removes the listener behind `subscription`. Returns `false` when it was already gone.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.state
            .write()
            .expect("lock poisoned")
            .remove(subscription.kind, subscription.id)
    }

    pub fn listener_count(&self, kind: ConsentEventKind) -> usize {
        self.state
            .read()
            .expect("lock poisoned")
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Delivers `event` to every listener of its kind and returns how many were called.
    pub fn publish(&self, event: &ConsentEvent) -> usize {
        let listeners: Vec<ConsentListener> = self
            .state
            .read()
            .expect("lock poisoned")
            .listeners
            .get(&event.kind)
            .map(|listeners| listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        tracing::debug!(
            target: "events",
            kind = %event.kind,
            listeners = listeners.len(),
            "consent_event_emitted"
        );
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }
}

/// Handle returned by [`EventBus::subscribe`]. Unsubscribing is idempotent and outliving the bus
/// is harmless.
#[derive(Debug, Clone)]
pub struct Subscription {
    kind: ConsentEventKind,
    id: ListenerId,
    bus: Weak<RwLock<BusState>>,
}

impl Subscription {
    pub fn kind(&self) -> ConsentEventKind {
        self.kind
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn unsubscribe(&self) -> bool {
        let Some(state) = self.bus.upgrade() else {
            return false;
        };
        state
            .write()
            .expect("lock poisoned")
            .remove(self.kind, self.id)
    }
}
