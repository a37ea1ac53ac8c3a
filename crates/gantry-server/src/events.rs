//! Lifecycle event fan-out
//!
//! Observers register with the controller and receive state-change events
//! synchronously. The set may be mutated while an event is being delivered:
//! delivery iterates a snapshot taken under a short lock.

use std::sync::{Arc, Mutex};

use tracing::debug;

/// Controller lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerEvent {
    /// The controller received its first configuration
    Configured,
    /// The server began accepting connections
    Started,
    /// The server stopped (emitted even when it was already stopped)
    Stopped,
}

/// Observer of controller state changes
pub trait ServerListener: Send + Sync {
    /// Called synchronously for every lifecycle event
    fn state_changed(&self, event: ServerEvent);
}

/// Set of lifecycle observers with snapshot iteration.
///
/// Registering the same observer (by pointer identity) twice is a no-op.
#[derive(Default)]
pub struct ListenerSet {
    listeners: Mutex<Vec<Arc<dyn ServerListener>>>,
}

impl ListenerSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; duplicates are ignored
    pub fn add(&self, listener: Arc<dyn ServerListener>) {
        let mut listeners = self.listeners.lock().expect("listener set poisoned");
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            debug!("Listener already registered; ignoring");
            return;
        }
        listeners.push(listener);
    }

    /// Remove an observer; absent observers are ignored
    pub fn remove(&self, listener: &Arc<dyn ServerListener>) {
        let mut listeners = self.listeners.lock().expect("listener set poisoned");
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.listeners.lock().expect("listener set poisoned").len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every observer registered at this moment.
    ///
    /// Completes before returning; observers added during delivery see
    /// only later events.
    pub fn notify(&self, event: ServerEvent) {
        let snapshot: Vec<Arc<dyn ServerListener>> = {
            let listeners = self.listeners.lock().expect("listener set poisoned");
            listeners.clone()
        };
        debug!(?event, observers = snapshot.len(), "Notifying listeners");
        for listener in snapshot {
            listener.state_changed(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    impl ServerListener for Counter {
        fn state_changed(&self, _event: ServerEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn duplicate_registration_is_a_noop() {
        let set = ListenerSet::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let as_listener: Arc<dyn ServerListener> = counter.clone();

        set.add(as_listener.clone());
        set.add(as_listener.clone());
        assert_eq!(set.len(), 1);

        set.notify(ServerEvent::Configured);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listener_no_longer_receives_events() {
        let set = ListenerSet::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let as_listener: Arc<dyn ServerListener> = counter.clone();

        set.add(as_listener.clone());
        set.notify(ServerEvent::Started);
        set.remove(&as_listener);
        set.notify(ServerEvent::Stopped);

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn listener_may_remove_itself_during_delivery() {
        struct SelfRemover {
            set: Arc<ListenerSet>,
            me: Mutex<Option<Arc<dyn ServerListener>>>,
        }

        impl ServerListener for SelfRemover {
            fn state_changed(&self, _event: ServerEvent) {
                if let Some(me) = self.me.lock().unwrap().take() {
                    self.set.remove(&me);
                }
            }
        }

        let set = Arc::new(ListenerSet::new());
        let remover = Arc::new(SelfRemover {
            set: set.clone(),
            me: Mutex::new(None),
        });
        let as_listener: Arc<dyn ServerListener> = remover.clone();
        *remover.me.lock().unwrap() = Some(as_listener.clone());

        set.add(as_listener);
        set.notify(ServerEvent::Stopped);
        assert!(set.is_empty());
    }
}
