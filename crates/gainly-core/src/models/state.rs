use serde::{Deserialize, Serialize};

use super::{Session, User};

/// The session store's view of who is logged in.
///
/// `Unknown` only exists until the first session check or provider event
/// has been processed; it is never re-entered for the life of a store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionState {
    #[default]
    Unknown,
    Authenticated(User),
    Unauthenticated,
}

impl SessionState {
    /// Derive the state from an optional provider session.
    pub fn from_session(session: Option<&Session>) -> Self {
        match session {
            Some(session) => SessionState::Authenticated(session.user.clone()),
            None => SessionState::Unauthenticated,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            user: self.user().cloned(),
            loading: self.is_loading(),
        }
    }
}

/// The `{user, loading}` pair consumers render from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthSnapshot {
    pub user: Option<User>,
    pub loading: bool,
}
