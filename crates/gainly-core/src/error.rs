use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length for provider messages carried in errors
const MAX_ERROR_MESSAGE_LENGTH: usize = 500;

/// Coarse category of a provider-reported failure.
///
/// Classification is done by the provider adapter; the session store
/// passes errors through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ProviderErrorKind {
    InvalidCredentials,
    UserAlreadyExists,
    WeakPassword,
    RateLimited,
    Network,
    Service,
    InvalidResponse,
    Other,
}

/// A failure reported by the identity provider, rendered verbatim to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build an error from an untrusted response body, capping its length
    pub(crate) fn truncated(kind: ProviderErrorKind, message: &str) -> Self {
        Self::new(kind, truncate_message(message))
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidResponse, message)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::invalid_response(err.to_string())
        } else {
            ProviderError::network(err.to_string())
        }
    }
}

/// Caller-side input problems, detected before any provider call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Email is required")]
    MissingEmail,

    #[error("Please enter a valid email")]
    InvalidEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Session store has been torn down")]
    StoreClosed,

    #[error("Session store must be started inside a Tokio runtime")]
    NoRuntime,
}

impl AuthError {
    /// The provider error, if this is one.
    pub fn provider(&self) -> Option<&ProviderError> {
        match self {
            AuthError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

/// Truncate a provider message to avoid carrying excessive data around
fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_ERROR_MESSAGE_LENGTH {
        return message.to_string();
    }
    let mut end = MAX_ERROR_MESSAGE_LENGTH;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}... (truncated, {} total bytes)",
        &message[..end],
        message.len()
    )
}
