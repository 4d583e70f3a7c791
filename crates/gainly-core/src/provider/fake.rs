//! Scriptable in-process provider for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{AuthCallback, AuthData, Credentials, IdentityProvider, Listeners, OAuthData, Subscription};
use crate::error::ProviderError;
use crate::models::{AuthEvent, Session};

type FetchResult = Result<Option<Session>, ProviderError>;

/// Resolves the fake provider's pending initial session fetch.
pub(crate) struct FetchControl {
    tx: oneshot::Sender<FetchResult>,
}

impl FetchControl {
    pub(crate) fn resolve(self, result: FetchResult) {
        let _ = self.tx.send(result);
    }
}

#[derive(Default)]
struct Script {
    sign_up: Option<Result<AuthData, ProviderError>>,
    sign_in: Option<Result<AuthData, ProviderError>>,
    sign_out: Option<Result<(), ProviderError>>,
}

pub(crate) struct FakeProvider {
    listeners: Listeners,
    fetch: Mutex<Option<oneshot::Receiver<FetchResult>>>,
    script: Mutex<Script>,
    calls: Mutex<Vec<&'static str>>,
    subscribe_count: Mutex<usize>,
}

impl FakeProvider {
    /// A provider whose initial fetch stays pending until the control resolves it.
    pub(crate) fn new() -> (Arc<Self>, FetchControl) {
        let (tx, rx) = oneshot::channel();
        let provider = Arc::new(Self {
            listeners: Listeners::new(),
            fetch: Mutex::new(Some(rx)),
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
            subscribe_count: Mutex::new(0),
        });
        (provider, FetchControl { tx })
    }

    /// A provider whose initial fetch resolves immediately.
    pub(crate) fn resolved(result: FetchResult) -> Arc<Self> {
        let (provider, control) = Self::new();
        control.resolve(result);
        provider
    }

    pub(crate) fn emit(&self, event: AuthEvent, session: Option<Session>) {
        self.listeners.emit(event, session);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn subscribe_count(&self) -> usize {
        *self.subscribe_count.lock().unwrap()
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn script_sign_up(&self, result: Result<AuthData, ProviderError>) {
        self.script.lock().unwrap().sign_up = Some(result);
    }

    pub(crate) fn script_sign_in(&self, result: Result<AuthData, ProviderError>) {
        self.script.lock().unwrap().sign_in = Some(result);
    }

    pub(crate) fn script_sign_out(&self, result: Result<(), ProviderError>) {
        self.script.lock().unwrap().sign_out = Some(result);
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError> {
        self.record("get_current_session");
        let rx = self.fetch.lock().unwrap().take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ProviderError::network("fetch abandoned"))),
            None => Ok(None),
        }
    }

    fn subscribe(&self, callback: AuthCallback) -> Subscription {
        self.record("subscribe");
        *self.subscribe_count.lock().unwrap() += 1;
        self.listeners.add(callback)
    }

    async fn sign_up(&self, _credentials: Credentials) -> Result<AuthData, ProviderError> {
        self.record("sign_up");
        self.script.lock().unwrap().sign_up.take().unwrap_or_else(|| Ok(AuthData::default()))
    }

    async fn sign_in_with_password(&self, _credentials: Credentials) -> Result<AuthData, ProviderError> {
        self.record("sign_in_with_password");
        self.script.lock().unwrap().sign_in.take().unwrap_or_else(|| Ok(AuthData::default()))
    }

    async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthData, ProviderError> {
        self.record("sign_in_with_oauth");
        Ok(OAuthData {
            provider: provider.to_string(),
            url: format!("https://auth.test/authorize?provider={}&redirect_to={}", provider, redirect_to),
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record("sign_out");
        self.script.lock().unwrap().sign_out.take().unwrap_or(Ok(()))
    }
}
