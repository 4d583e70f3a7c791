use tracing::debug;

use super::validation::{sanitize_email, sanitize_password, validate_registration};
use super::{FormState, FormStatus};
use crate::auth::SessionStore;
use crate::config::{Config, DEFAULT_MIN_PASSWORD_LENGTH};
use crate::error::AuthError;
use crate::provider::OAuthData;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The provider wants the address confirmed before a session exists.
    ConfirmationSent { email: String },
    /// The provider issued a session straight away.
    SignedIn,
}

/// Registration form state.
#[derive(Debug, Clone)]
pub struct RegisterFlow {
    email: String,
    password: String,
    confirm_password: String,
    min_password_length: usize,
    form: FormState,
    outcome: Option<RegisterOutcome>,
}

impl Default for RegisterFlow {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PASSWORD_LENGTH)
    }
}

impl RegisterFlow {
    pub fn new(min_password_length: usize) -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            min_password_length,
            form: FormState::default(),
            outcome: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.min_password_length)
    }

    pub fn set_email(&mut self, value: &str) {
        self.email = sanitize_email(value);
    }

    pub fn set_password(&mut self, value: &str) {
        self.password = sanitize_password(value);
    }

    pub fn set_confirm_password(&mut self, value: &str) {
        self.confirm_password = sanitize_password(value);
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn error(&self) -> Option<&str> {
        self.form.error.as_deref()
    }

    pub fn status(&self) -> FormStatus {
        self.form.status
    }

    pub fn is_pending(&self) -> bool {
        self.form.is_pending()
    }

    /// Outcome of the last successful submit, for the "check your mail" screen
    pub fn outcome(&self) -> Option<&RegisterOutcome> {
        self.outcome.as_ref()
    }

    pub async fn submit(&mut self, store: &SessionStore) -> Result<RegisterOutcome, AuthError> {
        if let Err(err) = validate_registration(
            &self.email,
            &self.password,
            &self.confirm_password,
            self.min_password_length,
        ) {
            let err = AuthError::from(err);
            self.form.fail(&err);
            return Err(err);
        }

        self.form.begin();
        debug!(email = %self.email, "Submitting registration form");
        let result = store.sign_up(&self.email, &self.password).await.map(|data| {
            if data.session.is_some() {
                RegisterOutcome::SignedIn
            } else {
                RegisterOutcome::ConfirmationSent {
                    email: self.email.clone(),
                }
            }
        });

        if let Ok(outcome) = &result {
            self.password.clear();
            self.confirm_password.clear();
            self.outcome = Some(outcome.clone());
        }
        self.form.settle(result)
    }

    pub async fn sign_in_with_google(&mut self, store: &SessionStore, redirect_to: &str) -> Result<OAuthData, AuthError> {
        self.form.begin();
        let result = store.sign_in_with_google(redirect_to).await;
        self.form.settle(result)
    }
}
