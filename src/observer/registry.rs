use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

/// Callback invoked with no arguments whenever the observed lifecycle or data changes.
pub type Observer = Arc<dyn Fn() + Send + Sync>;

struct Slot {
    id: usize,
    // `None` slots are kept and skipped on notification.
    observer: Option<Observer>,
}

struct RegistryInner {
    next_id: AtomicUsize,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RegistryInner {
    fn remove(&self, name: &str, id: usize) {
        let mut slots = self.slots.lock();
        if slots.get(name).is_some_and(|slot| slot.id == id) {
            slots.remove(name);
        }
    }
}

/// Named observers of a single store or collection.
#[derive(Clone)]
pub struct ObserverRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                next_id: AtomicUsize::new(0),
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register `observer` under `name`, replacing any earlier registration
    /// with the same name.
    ///
    /// A `None` observer occupies the name but is skipped by [`notify`](Self::notify).
    pub fn subscribe(&self, name: impl Into<String>, observer: Option<Observer>) -> Subscription {
        let name = name.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .slots
            .lock()
            .insert(name.clone(), Slot { id, observer });
        Subscription {
            name,
            id,
            registry: Arc::downgrade(&self.inner),
            active: true,
        }
    }

    /// Call every registered observer.
    ///
    /// Callbacks run after the registry lock is released, so an observer may
    /// subscribe or unsubscribe while being notified.
    pub fn notify(&self) {
        let observers: Vec<Observer> = {
            let slots = self.inner.slots.lock();
            slots
                .values()
                .filter_map(|slot| slot.observer.clone())
                .collect()
        };
        trace!(observers = observers.len(), "notifying observers");
        for observer in observers {
            observer();
        }
    }

    /// Number of registered names, including empty slots.
    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.slots.lock().contains_key(name)
    }
}

/// RAII handle for an observer registration.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) removes the
/// registration, unless the name has since been taken by a newer one.
/// [`detach`](Self::detach) keeps the observer registered for as long as the
/// registry lives.
#[must_use = "dropping a Subscription unsubscribes the observer; call `detach` to keep it"]
pub struct Subscription {
    name: String,
    id: usize,
    registry: Weak<RegistryInner>,
    active: bool,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unsubscribe(self) {
        drop(self);
    }

    pub fn detach(mut self) {
        self.active = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.name, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
