use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::gate::AccessGate;
use crate::config::DEFAULT_LOGIN_PATH;
use crate::error::AuthError;
use crate::models::{AuthSnapshot, SessionState, User};
use crate::provider::{AuthCallback, AuthData, Credentials, IdentityProvider, OAuthData, Subscription};

/// Provider name used for Google sign-in
const GOOGLE_PROVIDER: &str = "google";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single authority for who is logged in.
///
/// The store is the only writer of `SessionState`. It is written from two
/// places: completion of the initial session check, and the provider's auth
/// event callback. The mutation operations never write state themselves;
/// their effect arrives as a provider event.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<SessionState>>,
    subscription: Mutex<Subscription>,
    initial_fetch: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    login_path: String,
}

impl SessionStore {
    /// Like [`SessionStore::init`], but reports a missing tokio runtime as
    /// `AuthError::NoRuntime` instead of panicking.
    pub fn try_init(provider: Arc<dyn IdentityProvider>) -> Result<Self, AuthError> {
        if tokio::runtime::Handle::try_current().is_err() {
            error!("Session store started outside a tokio runtime");
            return Err(AuthError::NoRuntime);
        }
        Ok(Self::init(provider))
    }

    /// Start a store: issue the initial session check, then subscribe to
    /// provider events.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use
    /// [`SessionStore::try_init`] to get an error instead.
    pub fn init(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _) = watch::channel(SessionState::Unknown);
        let state = Arc::new(tx);

        let initial_fetch = tokio::spawn(Self::initial_fetch(Arc::clone(&provider), Arc::clone(&state)));

        let event_state = Arc::clone(&state);
        let callback: AuthCallback = Arc::new(move |event, session| {
            let next = SessionState::from_session(session.as_ref());
            debug!(%event, authenticated = next.is_authenticated(), "Auth event received");
            event_state.send_if_modified(|current| {
                if *current == next {
                    false
                } else {
                    *current = next;
                    true
                }
            });
        });
        let subscription = provider.subscribe(callback);
        debug!("Session store initialised");

        Self {
            provider,
            state,
            subscription: Mutex::new(subscription),
            initial_fetch: Mutex::new(Some(initial_fetch)),
            closed: AtomicBool::new(false),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Route protected views redirect to when nobody is logged in
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    /// Resolve the pending state from the provider's current session.
    /// An event that arrived first is newer and is left alone; a failed
    /// check counts as signed out so the UI never stays pending.
    async fn initial_fetch(provider: Arc<dyn IdentityProvider>, state: Arc<watch::Sender<SessionState>>) {
        let resolved = match provider.get_current_session().await {
            Ok(session) => SessionState::from_session(session.as_ref()),
            Err(err) => {
                warn!(error = %err, "Initial session check failed, treating visitor as signed out");
                SessionState::Unauthenticated
            }
        };

        let authenticated = resolved.is_authenticated();
        let applied = state.send_if_modified(|current| {
            if current.is_loading() {
                *current = resolved;
                true
            } else {
                false
            }
        });

        if applied {
            debug!(authenticated, "Initial session check resolved");
        } else {
            debug!("Initial session check superseded by an auth event");
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().snapshot()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// A receiver that is notified on every state change
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn gate(&self) -> AccessGate {
        AccessGate::new(self.watch(), self.login_path.clone())
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn ensure_open(&self, operation: &'static str) -> Result<(), AuthError> {
        if self.is_closed() {
            error!(operation, "Session store used after teardown");
            return Err(AuthError::StoreClosed);
        }
        Ok(())
    }

    /// Register a new account. A successful call does not mean the visitor
    /// is logged in: the provider may require e-mail confirmation first.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthData, AuthError> {
        self.ensure_open("sign_up")?;
        match self.provider.sign_up(Credentials::new(email, password)).await {
            Ok(data) => {
                info!(has_session = data.session.is_some(), "Sign-up accepted");
                Ok(data)
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "Sign-up failed");
                Err(err.into())
            }
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthData, AuthError> {
        self.ensure_open("sign_in_with_password")?;
        match self.provider.sign_in_with_password(Credentials::new(email, password)).await {
            Ok(data) => {
                info!("Password sign-in accepted");
                Ok(data)
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "Password sign-in failed");
                Err(err.into())
            }
        }
    }

    /// Start a redirect-based federated sign-in. The session only shows up
    /// after the browser returns and the provider emits an event.
    pub async fn sign_in_with_provider(&self, provider_name: &str, redirect_to: &str) -> Result<OAuthData, AuthError> {
        self.ensure_open("sign_in_with_provider")?;
        match self.provider.sign_in_with_oauth(provider_name, redirect_to).await {
            Ok(data) => {
                info!(provider = provider_name, "Federated sign-in started");
                Ok(data)
            }
            Err(err) => {
                warn!(provider = provider_name, kind = ?err.kind, error = %err, "Federated sign-in failed");
                Err(err.into())
            }
        }
    }

    pub async fn sign_in_with_google(&self, redirect_to: &str) -> Result<OAuthData, AuthError> {
        self.sign_in_with_provider(GOOGLE_PROVIDER, redirect_to).await
    }

    /// Sign out. State is left untouched if the provider call fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.ensure_open("sign_out")?;
        match self.provider.sign_out().await {
            Ok(()) => {
                info!("Sign-out accepted");
                Ok(())
            }
            Err(err) => {
                warn!(kind = ?err.kind, error = %err, "Sign-out failed");
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Release the provider subscription and stop a pending initial check.
    /// Safe to call more than once.
    pub fn teardown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        lock(&self.subscription).unsubscribe();
        if let Some(task) = lock(&self.initial_fetch).take() {
            task.abort();
        }
        info!("Session store torn down");
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::GateDecision;
    use crate::error::{ProviderError, ProviderErrorKind};
    use crate::models::{AuthEvent, Session};
    use crate::provider::fake::FakeProvider;

    fn session_for(id: &str, email: &str) -> Session {
        Session::new(User::new(id, email), format!("token-{}", id))
    }

    fn redirect() -> GateDecision {
        GateDecision::RedirectTo("/login".to_string())
    }

    #[tokio::test]
    async fn test_pending_until_fetch_then_event_renders() {
        let (provider, fetch) = FakeProvider::new();
        let store = SessionStore::init(provider.clone());
        let mut gate = store.gate();

        assert_eq!(gate.current(), GateDecision::Pending);
        assert!(store.is_loading());
        assert_eq!(store.snapshot(), AuthSnapshot { user: None, loading: true });

        fetch.resolve(Ok(None));
        assert_eq!(gate.changed().await, Some(redirect()));
        assert!(!store.is_loading());

        provider.emit(AuthEvent::SignedIn, Some(session_for("1", "a@b.com")));
        assert_eq!(gate.changed().await, Some(GateDecision::Render));
        let user = store.user().expect("user should be exposed");
        assert_eq!(user.email.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_initial_fetch_with_session_authenticates() {
        let provider = FakeProvider::resolved(Ok(Some(session_for("1", "a@b.com"))));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();

        rx.changed().await.expect("store alive");
        assert_eq!(store.state(), SessionState::Authenticated(User::new("1", "a@b.com")));
        assert!(provider.calls().contains(&"get_current_session"));
    }

    #[tokio::test]
    async fn test_failed_fetch_resolves_to_unauthenticated() {
        let provider = FakeProvider::resolved(Err(ProviderError::network("connection reset")));
        let store = SessionStore::init(provider);
        let mut rx = store.watch();

        rx.changed().await.expect("store alive");
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert_eq!(store.gate().current(), redirect());
    }

    #[tokio::test]
    async fn test_event_before_fetch_ends_loading_and_wins() {
        let (provider, fetch) = FakeProvider::new();
        let store = SessionStore::init(provider.clone());

        provider.emit(AuthEvent::SignedIn, Some(session_for("1", "a@b.com")));
        assert!(!store.is_loading());
        assert_eq!(store.gate().current(), GateDecision::Render);

        // A late fetch that saw no session must not clobber the newer event
        fetch.resolve(Ok(None));
        let task = lock(&store.initial_fetch).take();
        if let Some(task) = task {
            task.await.expect("fetch task should finish");
        }
        assert_eq!(store.state(), SessionState::Authenticated(User::new("1", "a@b.com")));
    }

    #[tokio::test]
    async fn test_signed_out_event_before_fetch_wins() {
        let (provider, fetch) = FakeProvider::new();
        let store = SessionStore::init(provider.clone());

        provider.emit(AuthEvent::SignedOut, None);
        assert!(!store.is_loading());
        assert_eq!(store.gate().current(), redirect());

        // A late fetch that still saw a session must not resurrect it
        fetch.resolve(Ok(Some(session_for("1", "a@b.com"))));
        let task = lock(&store.initial_fetch).take();
        if let Some(task) = task {
            task.await.expect("fetch task should finish");
        }
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert_eq!(store.gate().current(), redirect());
    }

    #[test]
    fn test_try_init_outside_runtime_is_an_error() {
        let (provider, _fetch) = FakeProvider::new();
        let result = SessionStore::try_init(provider.clone());

        assert!(matches!(result, Err(AuthError::NoRuntime)));
        assert_eq!(provider.subscribe_count(), 0);
    }

    #[tokio::test]
    async fn test_latest_event_determines_state() {
        let provider = FakeProvider::resolved(Ok(None));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");

        let sequence = [
            (AuthEvent::SignedIn, Some(session_for("1", "a@b.com"))),
            (AuthEvent::TokenRefreshed, Some(session_for("1", "a@b.com"))),
            (AuthEvent::SignedOut, None),
            (AuthEvent::SignedIn, Some(session_for("2", "c@d.com"))),
            (AuthEvent::UserUpdated, Some(session_for("3", "e@f.com"))),
        ];
        for (event, session) in sequence {
            let expected = SessionState::from_session(session.as_ref());
            provider.emit(event, session);
            assert_eq!(store.state(), expected);
            assert!(!store.is_loading());
        }
    }

    #[tokio::test]
    async fn test_mutations_do_not_write_state() {
        let provider = FakeProvider::resolved(Ok(None));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");

        provider.script_sign_up(Ok(AuthData {
            user: Some(User::new("1", "a@b.com")),
            session: None,
        }));
        let data = store.sign_up("a@b.com", "secret1").await.expect("sign up");
        assert!(data.session.is_none());
        assert_eq!(store.state(), SessionState::Unauthenticated);

        provider.script_sign_in(Ok(AuthData {
            user: Some(User::new("1", "a@b.com")),
            session: Some(session_for("1", "a@b.com")),
        }));
        store.sign_in_with_password("a@b.com", "secret1").await.expect("sign in");
        assert_eq!(store.state(), SessionState::Unauthenticated);

        provider.emit(AuthEvent::SignedIn, Some(session_for("1", "a@b.com")));
        assert!(store.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_in_error_passes_through_unchanged() {
        let provider = FakeProvider::resolved(Ok(None));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");

        let provider_error = ProviderError::new(ProviderErrorKind::InvalidCredentials, "Invalid login credentials");
        provider.script_sign_in(Err(provider_error.clone()));

        let err = store
            .sign_in_with_password("a@b.com", "wrong")
            .await
            .expect_err("sign in should fail");
        assert_eq!(err, AuthError::Provider(provider_error));
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert_eq!(store.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_sign_out_then_event_unauthenticates() {
        let provider = FakeProvider::resolved(Ok(Some(session_for("1", "a@b.com"))));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");
        assert!(store.state().is_authenticated());

        store.sign_out().await.expect("sign out");
        provider.emit(AuthEvent::SignedOut, None);
        assert_eq!(store.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_failed_sign_out_keeps_state() {
        let provider = FakeProvider::resolved(Ok(Some(session_for("1", "a@b.com"))));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");

        provider.script_sign_out(Err(ProviderError::network("offline")));
        let err = store.sign_out().await.expect_err("sign out should fail");
        assert_eq!(err.provider().map(|e| e.kind), Some(ProviderErrorKind::Network));
        assert!(store.state().is_authenticated());
    }

    #[tokio::test]
    async fn test_google_sign_in_targets_redirect() {
        let provider = FakeProvider::resolved(Ok(None));
        let store = SessionStore::init(provider.clone());

        let data = store.sign_in_with_google("https://gainly.app").await.expect("oauth");
        assert_eq!(data.provider, "google");
        assert!(data.url.contains("redirect_to=https://gainly.app"));
        assert!(provider.calls().contains(&"sign_in_with_oauth"));
    }

    #[tokio::test]
    async fn test_teardown_releases_subscription_once() {
        let (provider, _fetch) = FakeProvider::new();
        let store = SessionStore::init(provider.clone());
        assert_eq!(provider.listener_count(), 1);

        store.teardown();
        assert_eq!(provider.listener_count(), 0);
        store.teardown();
        assert_eq!(provider.listener_count(), 0);
        assert_eq!(provider.subscribe_count(), 1);

        // Events after teardown no longer reach the store
        provider.emit(AuthEvent::SignedIn, Some(session_for("1", "a@b.com")));
        assert!(store.is_loading());
    }

    #[tokio::test]
    async fn test_operations_after_teardown_are_rejected() {
        let provider = FakeProvider::resolved(Ok(None));
        let store = SessionStore::init(provider.clone());
        store.teardown();

        assert_eq!(store.sign_out().await, Err(AuthError::StoreClosed));
        assert_eq!(
            store.sign_in_with_password("a@b.com", "secret1").await,
            Err(AuthError::StoreClosed)
        );
        assert!(!provider.calls().contains(&"sign_out"));
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let (provider, _fetch) = FakeProvider::new();
        let store = SessionStore::init(provider.clone());
        let mut gate = store.gate();
        assert_eq!(provider.listener_count(), 1);

        drop(store);
        assert_eq!(provider.listener_count(), 0);
        assert_eq!(gate.changed().await, None);
    }
}
