//! Login, register and dashboard interactions.
//!
//! Each flow holds its form fields plus an inline error and a status, and
//! calls `SessionStore` operations. Flows never write session state; a
//! successful sign-in shows up through the store's provider events.

pub mod dashboard;
pub mod login;
pub mod register;
pub mod validation;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub use dashboard::DashboardFlow;
pub use login::{LoginFlow, LoginOutcome};
pub use register::{RegisterFlow, RegisterOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum FormStatus {
    #[default]
    Idle,
    Pending,
    Failed,
    Succeeded,
}

/// Inline error and status shared by every form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub error: Option<String>,
    pub status: FormStatus,
}

impl FormState {
    fn begin(&mut self) {
        self.error = None;
        self.status = FormStatus::Pending;
    }

    fn fail(&mut self, err: &AuthError) {
        self.error = Some(err.to_string());
        self.status = FormStatus::Failed;
    }

    fn succeed(&mut self) {
        self.error = None;
        self.status = FormStatus::Succeeded;
    }

    /// Record the outcome of a store call and hand it back to the caller
    fn settle<T>(&mut self, result: Result<T, AuthError>) -> Result<T, AuthError> {
        match &result {
            Ok(_) => self.succeed(),
            Err(err) => self.fail(err),
        }
        result
    }

    pub fn is_pending(&self) -> bool {
        self.status == FormStatus::Pending
    }
}
