//! Gainly core - client-side session management.
//!
//! Tracks whether the visitor is authenticated, exposes e-mail/password and
//! federated sign-in, sign-up and sign-out, and decides how protected views
//! render. `SessionStore` is the single authority for the login state; it
//! is fed by an initial session check and by the identity provider's auth
//! events, and `AccessGate` re-evaluates on every change.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gainly_core::{AuthContext, Config, SupabaseProvider};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let provider = Arc::new(SupabaseProvider::new(&config)?);
//! let context = AuthContext::with_config(provider, &config);
//!
//! let store = context.store()?;
//! let mut gate = store.gate();
//! while let Some(decision) = gate.changed().await {
//!     println!("protected view: {:?}", decision);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod models;
pub mod provider;
pub mod telemetry;

pub use auth::{AccessGate, AuthContext, GateDecision, SessionStore};
pub use config::Config;
pub use error::{AuthError, ProviderError, ProviderErrorKind, ValidationError};
pub use flows::{DashboardFlow, FormStatus, LoginFlow, LoginOutcome, RegisterFlow, RegisterOutcome};
pub use models::{AuthEvent, AuthSnapshot, Session, SessionState, User};
pub use provider::{AuthData, Credentials, IdentityProvider, OAuthData, Subscription, SupabaseProvider};
pub use telemetry::init_tracing;
