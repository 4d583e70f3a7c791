use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::models::SessionState;

/// What a protected view should do for the current session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "target", rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum GateDecision {
    /// The first session check has not finished; show a loading screen.
    Pending,
    RedirectTo(String),
    Render,
}

/// Decide how a protected view renders for `state`.
pub fn decide(state: &SessionState, login_path: &str) -> GateDecision {
    match state {
        SessionState::Unknown => GateDecision::Pending,
        SessionState::Unauthenticated => GateDecision::RedirectTo(login_path.to_string()),
        SessionState::Authenticated(_) => GateDecision::Render,
    }
}

/// Reactive access decision for protected views.
///
/// Holds its own receiver on the session store's state, so a session that is
/// revoked while a protected view is open produces a redirect on the next
/// state change rather than on the next navigation.
#[derive(Debug, Clone)]
pub struct AccessGate {
    rx: watch::Receiver<SessionState>,
    login_path: String,
}

impl AccessGate {
    pub fn new(rx: watch::Receiver<SessionState>, login_path: impl Into<String>) -> Self {
        Self {
            rx,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decision for the state as it is right now
    pub fn current(&self) -> GateDecision {
        decide(&self.rx.borrow(), &self.login_path)
    }

    /// Wait for the next state change and return the re-evaluated decision.
    /// Returns `None` once the session store is gone.
    pub async fn changed(&mut self) -> Option<GateDecision> {
        self.rx.changed().await.ok()?;
        let state = self.rx.borrow_and_update().clone();
        Some(decide(&state, &self.login_path))
    }

    /// Every decision following a state change, until the store is gone.
    pub fn into_stream(self) -> impl Stream<Item = GateDecision> {
        stream::unfold(self, |mut gate| async move {
            let decision = gate.changed().await?;
            Some((decision, gate))
        })
    }
}
