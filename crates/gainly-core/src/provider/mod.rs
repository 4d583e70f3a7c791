//! Identity provider boundary.
//!
//! The session store talks to the outside world only through the
//! `IdentityProvider` trait:
//! - `get_current_session` for the initial check on load
//! - `subscribe` for pushed auth events, returning a `Subscription` handle
//! - the four mutation operations (sign-up, password sign-in, OAuth, sign-out)
//!
//! `SupabaseProvider` implements the trait over the GoTrue REST API.

pub mod listeners;
pub mod supabase;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::models::{AuthEvent, Session, User};

pub use listeners::{Listeners, Subscription};
pub use supabase::SupabaseProvider;

/// Callback invoked for every auth event the provider emits.
pub type AuthCallback = Arc<dyn Fn(AuthEvent, Option<Session>) + Send + Sync>;

/// E-mail + password pair sent to the provider.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Payload of a sign-up or sign-in response.
///
/// Informational only: the authoritative session state arrives through
/// the event subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthData {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// Where to send the browser to start a federated sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OAuthData {
    pub provider: String,
    pub url: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Session the provider currently holds, if any.
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Register for auth events. Dropping the returned handle without
    /// calling `unsubscribe` leaves the registration in place.
    fn subscribe(&self, callback: AuthCallback) -> Subscription;

    async fn sign_up(&self, credentials: Credentials) -> Result<AuthData, ProviderError>;

    async fn sign_in_with_password(&self, credentials: Credentials) -> Result<AuthData, ProviderError>;

    async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthData, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;
}
