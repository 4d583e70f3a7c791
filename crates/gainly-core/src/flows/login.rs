use tracing::debug;

use super::validation::{sanitize_email, sanitize_password, validate_login};
use super::{FormState, FormStatus};
use crate::auth::SessionStore;
use crate::error::AuthError;
use crate::provider::OAuthData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted; the store flips to authenticated once the
    /// provider's sign-in event arrives.
    AwaitingSession,
}

/// Login form state.
#[derive(Debug, Clone, Default)]
pub struct LoginFlow {
    email: String,
    password: String,
    form: FormState,
}

impl LoginFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_email(&mut self, value: &str) {
        self.email = sanitize_email(value);
    }

    pub fn set_password(&mut self, value: &str) {
        self.password = sanitize_password(value);
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

    /// Validate and submit the credentials. Errors are kept as the inline
    /// message and also returned.
    pub async fn submit(&mut self, store: &SessionStore) -> Result<LoginOutcome, AuthError> {
        if let Err(err) = validate_login(&self.email, &self.password) {
            let err = AuthError::from(err);
            self.form.fail(&err);
            return Err(err);
        }

        self.form.begin();
        debug!(email = %self.email, "Submitting login form");
        let result = store
            .sign_in_with_password(&self.email, &self.password)
            .await
            .map(|_| LoginOutcome::AwaitingSession);

        if result.is_ok() {
            self.password.clear();
        }
        self.form.settle(result)
    }

    pub async fn sign_in_with_google(&mut self, store: &SessionStore, redirect_to: &str) -> Result<OAuthData, AuthError> {
        self.form.begin();
        let result = store.sign_in_with_google(redirect_to).await;
        self.form.settle(result)
    }
}
