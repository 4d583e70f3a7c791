use super::{FormState, FormStatus};
use crate::auth::SessionStore;
use crate::error::AuthError;

/// The protected landing page: shows who is signed in and offers sign-out.
#[derive(Debug, Clone, Default)]
pub struct DashboardFlow {
    form: FormState,
}

impl DashboardFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of the signed-in user, if any
    pub fn signed_in_as(&self, store: &SessionStore) -> Option<String> {
        store.user().map(|user| user.display_label().to_string())
    }

    pub fn error(&self) -> Option<&str> {
        self.form.error.as_deref()
    }

    pub fn status(&self) -> FormStatus {
        self.form.status
    }

    /// Sign out and return the route to navigate to. On failure the user
    /// stays on the page and the provider message is kept as inline error.
    pub async fn sign_out(&mut self, store: &SessionStore) -> Result<String, AuthError> {
        self.form.begin();
        let result = store.sign_out().await.map(|()| store.login_path().to_string());
        self.form.settle(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::{AuthEvent, Session, SessionState, User};
    use crate::provider::fake::FakeProvider;

    #[tokio::test]
    async fn test_shows_signed_in_email() {
        let session = Session::new(User::new("1", "a@b.com"), "token");
        let provider = FakeProvider::resolved(Ok(Some(session)));
        let store = SessionStore::init(provider);
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");

        let dashboard = DashboardFlow::new();
        assert_eq!(dashboard.signed_in_as(&store).as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_sign_out_navigates_to_login() {
        let session = Session::new(User::new("1", "a@b.com"), "token");
        let provider = FakeProvider::resolved(Ok(Some(session)));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");

        let mut dashboard = DashboardFlow::new();
        let target = dashboard.sign_out(&store).await.expect("sign out");
        assert_eq!(target, "/login");
        assert_eq!(dashboard.status(), FormStatus::Succeeded);

        provider.emit(AuthEvent::SignedOut, None);
        assert_eq!(store.state(), SessionState::Unauthenticated);
        assert!(dashboard.signed_in_as(&store).is_none());
    }

    #[tokio::test]
    async fn test_failed_sign_out_stays_with_error() {
        let session = Session::new(User::new("1", "a@b.com"), "token");
        let provider = FakeProvider::resolved(Ok(Some(session)));
        let store = SessionStore::init(provider.clone());
        let mut rx = store.watch();
        rx.changed().await.expect("store alive");
        provider.script_sign_out(Err(ProviderError::network("Failed to fetch")));

        let mut dashboard = DashboardFlow::new();
        dashboard.sign_out(&store).await.expect_err("sign out should fail");

        assert_eq!(dashboard.error(), Some("Failed to fetch"));
        assert!(store.state().is_authenticated());
    }
}
