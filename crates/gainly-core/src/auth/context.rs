use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{error, info};

use super::store::SessionStore;
use crate::config::{Config, DEFAULT_LOGIN_PATH};
use crate::error::AuthError;
use crate::provider::IdentityProvider;

/// Application-wide owner of the session store.
///
/// The store is created on first use and shared afterwards. Unmounting the
/// context tears the store down for good; a full reload builds a new context.
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    login_path: String,
    store: OnceLock<Arc<SessionStore>>,
    unmounted: AtomicBool,
}

impl AuthContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            store: OnceLock::new(),
            unmounted: AtomicBool::new(false),
        }
    }

    pub fn with_config(provider: Arc<dyn IdentityProvider>, config: &Config) -> Self {
        Self {
            provider,
            login_path: config.login_path.clone(),
            store: OnceLock::new(),
            unmounted: AtomicBool::new(false),
        }
    }

    /// The session store, initialised on first call.
    /// The first call must come from within a tokio runtime, otherwise it
    /// returns `AuthError::NoRuntime` and a later call may retry.
    pub fn store(&self) -> Result<Arc<SessionStore>, AuthError> {
        if self.is_unmounted() {
            error!("Auth context used after unmount");
            return Err(AuthError::StoreClosed);
        }

        let store = match self.store.get() {
            Some(store) => store,
            None => {
                let created = Arc::new(
                    SessionStore::try_init(Arc::clone(&self.provider))?.with_login_path(self.login_path.clone()),
                );
                match self.store.set(created) {
                    Ok(()) => info!("Session store initialised"),
                    // Another caller got there first; release the spare registration
                    Err(spare) => spare.teardown(),
                }
                self.store.get().ok_or(AuthError::StoreClosed)?
            }
        };

        // Lost a race with unmount
        if self.is_unmounted() {
            store.teardown();
            return Err(AuthError::StoreClosed);
        }
        Ok(Arc::clone(store))
    }

    pub fn is_initialized(&self) -> bool {
        self.store.get().is_some()
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted.load(Ordering::SeqCst)
    }

    /// Tear down the store, if one was ever created. Idempotent.
    pub fn unmount(&self) {
        if self.unmounted.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(store) = self.store.get() {
            store.teardown();
        }
        info!("Auth context unmounted");
    }
}

impl Drop for AuthContext {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::GateDecision;
    use crate::provider::fake::FakeProvider;

    #[tokio::test]
    async fn test_store_is_lazy_and_shared() {
        let (provider, _fetch) = FakeProvider::new();
        let context = AuthContext::new(provider.clone());
        assert!(!context.is_initialized());
        assert_eq!(provider.subscribe_count(), 0);

        let first = context.store().expect("store");
        let second = context.store().expect("store");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.subscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_unmount_tears_down_and_blocks_reinit() {
        let (provider, _fetch) = FakeProvider::new();
        let context = AuthContext::new(provider.clone());
        let store = context.store().expect("store");

        context.unmount();
        assert!(store.is_closed());
        assert_eq!(provider.listener_count(), 0);
        assert_eq!(context.store().err(), Some(AuthError::StoreClosed));

        context.unmount();
        assert_eq!(provider.subscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_unmount_before_first_use() {
        let (provider, _fetch) = FakeProvider::new();
        let context = AuthContext::new(provider.clone());
        context.unmount();

        assert!(context.store().is_err());
        assert_eq!(provider.subscribe_count(), 0);
    }

    #[test]
    fn test_store_outside_runtime_is_an_error() {
        let (provider, _fetch) = FakeProvider::new();
        let context = AuthContext::new(provider.clone());

        assert_eq!(context.store().err(), Some(AuthError::NoRuntime));
        assert!(!context.is_initialized());
        assert_eq!(provider.subscribe_count(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        let store = runtime.block_on(async { context.store() }).expect("store inside runtime");
        assert!(context.is_initialized());
        assert!(!store.is_closed());
        assert_eq!(provider.subscribe_count(), 1);
    }

    #[tokio::test]
    async fn test_config_login_path_reaches_gate() {
        let provider = FakeProvider::resolved(Ok(None));
        let config = Config {
            login_path: "/signin".to_string(),
            ..Config::default()
        };
        let context = AuthContext::with_config(provider, &config);
        let store = context.store().expect("store");
        let mut gate = store.gate();

        assert_eq!(gate.changed().await, Some(GateDecision::RedirectTo("/signin".to_string())));
    }
}
