use serde::{Deserialize, Serialize};

/// Kind of authentication notification pushed by the identity provider.
///
/// The session store reconciles every kind the same way; the kind is kept
/// for logging and for consumers that want to react to specific transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl std::fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEvent::InitialSession => write!(f, "INITIAL_SESSION"),
            AuthEvent::SignedIn => write!(f, "SIGNED_IN"),
            AuthEvent::SignedOut => write!(f, "SIGNED_OUT"),
            AuthEvent::TokenRefreshed => write!(f, "TOKEN_REFRESHED"),
            AuthEvent::UserUpdated => write!(f, "USER_UPDATED"),
            AuthEvent::PasswordRecovery => write!(f, "PASSWORD_RECOVERY"),
        }
    }
}
