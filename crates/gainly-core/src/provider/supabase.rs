//! Identity provider backed by the Supabase GoTrue REST API.
//!
//! The provider keeps the current session in memory only and emits
//! `SignedIn` / `SignedOut` events to its subscribers whenever a call it
//! made changed that session.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{AuthCallback, AuthData, Credentials, IdentityProvider, Listeners, OAuthData, Subscription};
use crate::config::Config;
use crate::error::{ProviderError, ProviderErrorKind};
use crate::models::{AuthEvent, Session, User};

/// Path prefix of the GoTrue service on a Supabase project
const AUTH_PATH: &str = "auth/v1";

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<WireUser> for User {
    fn from(user: WireUser) -> Self {
        User {
            id: user.id,
            email: user.email.filter(|e| !e.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: WireUser,
}

impl WireSession {
    fn into_session(self) -> Session {
        let expires_at = expiry_from(self.expires_at, self.expires_in);
        Session {
            user: self.user.into(),
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            expires_at,
        }
    }
}

/// Sign-up answers with a full session when e-mail confirmation is off,
/// and with the bare user record when confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(WireSession),
    User(WireUser),
}

#[derive(Debug, Default, Deserialize)]
struct WireError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn expiry_from(expires_at: Option<i64>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    match (expires_at, expires_in) {
        (Some(at), _) => DateTime::from_timestamp(at, 0),
        // Lifetimes beyond chrono's range are treated as unknown
        (None, Some(secs)) => chrono::Duration::try_seconds(secs).and_then(|d| Utc::now().checked_add_signed(d)),
        (None, None) => None,
    }
}

/// Map a GoTrue error response onto a provider error.
fn classify(status: StatusCode, body: &str) -> ProviderError {
    let wire: WireError = serde_json::from_str(body).unwrap_or_default();

    let kind = match (wire.error_code.as_deref(), wire.error.as_deref()) {
        (Some("invalid_credentials"), _) | (_, Some("invalid_grant")) => ProviderErrorKind::InvalidCredentials,
        (Some("user_already_exists" | "email_exists"), _) => ProviderErrorKind::UserAlreadyExists,
        (Some("weak_password"), _) => ProviderErrorKind::WeakPassword,
        (Some("over_request_rate_limit" | "over_email_send_rate_limit"), _) => ProviderErrorKind::RateLimited,
        _ => match status.as_u16() {
            429 => ProviderErrorKind::RateLimited,
            500..=599 => ProviderErrorKind::Service,
            _ => ProviderErrorKind::Other,
        },
    };

    let message = wire
        .error_description
        .or(wire.msg)
        .or(wire.message)
        .or(wire.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("Status {}", status)
            } else {
                format!("Status {}: {}", status, body.trim())
            }
        });

    ProviderError::truncated(kind, &message)
}

pub struct SupabaseProvider {
    client: Client,
    base_url: String,
    anon_key: String,
    listeners: Listeners,
    session: Mutex<Option<Session>>,
}

impl SupabaseProvider {
    /// Create a provider for the project configured in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.supabase_url)
            .with_context(|| format!("Invalid Supabase URL: {}", config.supabase_url))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            listeners: Listeners::new(),
            session: Mutex::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, AUTH_PATH, path)
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self) -> Option<Session> {
        self.session_slot().clone()
    }

    /// Replace the held session and notify subscribers. The slot stays
    /// locked while emitting so events reach subscribers in slot order.
    fn establish(&self, event: AuthEvent, session: Option<Session>) {
        let mut slot = self.session_slot();
        *slot = session.clone();
        self.listeners.emit(event, session);
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    async fn check_response(response: Response) -> Result<Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(classify(status, &body))
        }
    }

    /// Finish a federated sign-in once the browser has come back from the
    /// external provider. `redirect_url` is the full URL the app was loaded
    /// with; GoTrue puts the tokens (or an error) in its fragment.
    pub async fn complete_oauth_redirect(&self, redirect_url: &str) -> Result<Session, ProviderError> {
        let url = Url::parse(redirect_url)
            .map_err(|e| ProviderError::invalid_response(format!("Invalid redirect URL: {}", e)))?;

        let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        if let Some(fragment) = url.fragment() {
            params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
        }

        if let Some(description) = params.get("error_description").or_else(|| params.get("error")) {
            warn!(error = %description, "OAuth redirect carried an error");
            return Err(ProviderError::truncated(ProviderErrorKind::Other, description));
        }

        let access_token = params
            .get("access_token")
            .cloned()
            .ok_or_else(|| ProviderError::invalid_response("Redirect is missing an access token"))?;

        let response = self
            .with_api_key(self.client.get(self.endpoint("user")))
            .bearer_auth(&access_token)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let user: WireUser = response.json().await?;

        let parse_i64 = |key: &str| params.get(key).and_then(|v| v.parse::<i64>().ok());
        let session = Session {
            user: user.into(),
            access_token,
            token_type: params
                .get("token_type")
                .cloned()
                .unwrap_or_else(|| "bearer".to_string()),
            expires_at: expiry_from(parse_i64("expires_at"), parse_i64("expires_in")),
        };

        info!(user_id = %session.user.id, "OAuth sign-in completed");
        self.establish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseProvider {
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.current().filter(|session| !session.is_expired()))
    }

    fn subscribe(&self, callback: AuthCallback) -> Subscription {
        self.listeners.add(callback)
    }

    async fn sign_up(&self, credentials: Credentials) -> Result<AuthData, ProviderError> {
        debug!(email = %credentials.email, "Signing up");
        let response = self
            .with_api_key(self.client.post(self.endpoint("signup")))
            .bearer_auth(&self.anon_key)
            .json(&credentials)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(wire) => {
                let session = wire.into_session();
                info!(user_id = %session.user.id, "Signed up with immediate session");
                self.establish(AuthEvent::SignedIn, Some(session.clone()));
                Ok(AuthData {
                    user: Some(session.user.clone()),
                    session: Some(session),
                })
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "Signed up, awaiting e-mail confirmation");
                Ok(AuthData {
                    user: Some(user.into()),
                    session: None,
                })
            }
        }
    }

    async fn sign_in_with_password(&self, credentials: Credentials) -> Result<AuthData, ProviderError> {
        debug!(email = %credentials.email, "Signing in with password");
        let response = self
            .with_api_key(self.client.post(self.endpoint("token")))
            .bearer_auth(&self.anon_key)
            .query(&[("grant_type", "password")])
            .json(&credentials)
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        let session = response.json::<WireSession>().await?.into_session();
        info!(user_id = %session.user.id, "Signed in");
        self.establish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(AuthData {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> Result<OAuthData, ProviderError> {
        let url = Url::parse_with_params(
            &self.endpoint("authorize"),
            &[("provider", provider), ("redirect_to", redirect_to)],
        )
        .map_err(|e| ProviderError::new(ProviderErrorKind::Other, format!("Invalid authorize URL: {}", e)))?;

        debug!(provider, redirect_to, "Starting OAuth sign-in");
        Ok(OAuthData {
            provider: provider.to_string(),
            url: url.into(),
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.current() {
            let response = self
                .with_api_key(self.client.post(self.endpoint("logout")))
                .bearer_auth(&session.access_token)
                .send()
                .await?;

            // An already invalid token means the server side is signed out
            let status = response.status();
            if !matches!(status.as_u16(), 401 | 403 | 404) {
                Self::check_response(response).await?;
            } else {
                debug!(%status, "Session already invalid on the server");
            }
        }

        info!("Signed out");
        self.establish(AuthEvent::SignedOut, None);
        Ok(())
    }
}
