use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::AuthCallback;
use crate::models::{AuthEvent, Session};

/// Handle for an active auth-event registration.
///
/// Single owner; `unsubscribe` releases the registration the first time and
/// is a no-op afterwards.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, AuthCallback>,
}

/// Registry of auth-event callbacks, shared by provider implementations.
/// Clone is cheap and shares the registry.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<Mutex<Registry>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Callbacks run outside the lock, so a poisoned registry is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, callback: AuthCallback) -> Subscription {
        let id = {
            let mut registry = self.registry();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.insert(id, callback);
            id
        };
        debug!(listener = id, "Auth listener registered");

        let listeners = self.clone();
        Subscription::new(move || {
            listeners.registry().callbacks.remove(&id);
            debug!(listener = id, "Auth listener released");
        })
    }

    pub fn len(&self) -> usize {
        self.registry().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver an event to every registered callback, in registration order.
    pub fn emit(&self, event: AuthEvent, session: Option<Session>) {
        let callbacks: Vec<AuthCallback> = self.registry().callbacks.values().cloned().collect();
        debug!(%event, listeners = callbacks.len(), "Emitting auth event");
        for callback in callbacks {
            callback(event, session.clone());
        }
    }
}
