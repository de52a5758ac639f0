//! # Auth service façade
//!
//! [`AuthService`] turns UI intents into calls on an [`AuthBackend`]. Every
//! operation returns `Result<_, ApiError>` and never panics, so a page
//! component only has to render the `Err` message. The façade adds three
//! things on top of plain delegation:
//!
//! - **Sign-up messages**: known backend failures ("User already registered",
//!   rate limits, weak passwords, ...) get German text, see [`messages`].
//! - **OAuth allow-list**: only Google, GitHub and Apple are accepted. Any other
//!   provider name fails with [`ApiError::UnsupportedProvider`] and the backend
//!   is never called.
//! - **Redirects**: OAuth, email confirmation and password reset use the
//!   [`AuthRedirects`] derived from the app's site URL.
//!
//! Nothing is retried. A failed call surfaces once.
//!
//! The process-wide session state built on top of this façade lives in
//! [`context`].

pub mod context;
mod messages;

pub use context::{AuthDriver, AuthHandle, AuthPhase, AuthState};
pub use messages::translate_sign_up_message;

use crate::backend::{AuthBackend, AuthChangeEvent, Subscription};
use crate::config::BackendConfig;
use crate::error::{surface, ApiError};
use crate::models::{
    EmailVerification, OAuthProvider, OAuthRedirect, ResendKind, Session, SignUpOptions,
    SignUpResponse, User, UserAttributes,
};
use std::sync::Arc;

/// Redirect targets handed to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRedirects {
    pub oauth: Option<String>,
    pub email_confirmation: Option<String>,
    pub password_reset: Option<String>,
}

impl AuthRedirects {
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            oauth: config.oauth_redirect(),
            email_confirmation: config.oauth_redirect(),
            password_reset: config.password_reset_redirect(),
        }
    }
}

/// Façade over the backend's auth API.
#[derive(Clone)]
pub struct AuthService<B> {
    backend: B,
    redirects: AuthRedirects,
}

impl<B: AuthBackend> AuthService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            redirects: AuthRedirects::default(),
        }
    }

    pub fn with_redirects(mut self, redirects: AuthRedirects) -> Self {
        self.redirects = redirects;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Register a new account. Known failures come back in German.
    pub async fn sign_up_with_email(
        &self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<SignUpResponse, ApiError> {
        tracing::debug!("sign_up_with_email");
        let options = SignUpOptions {
            email_redirect_to: options
                .email_redirect_to
                .or_else(|| self.redirects.email_confirmation.clone()),
            ..options
        };
        self.backend
            .sign_up(email.trim(), password, &options)
            .await
            .map_err(|e| messages::localize_sign_up_error(surface("sign_up", e)))
    }

    pub async fn sign_in_with_email(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        tracing::debug!("sign_in_with_email");
        self.backend
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(|e| surface("sign_in_with_password", e))
    }

    /// Start an OAuth flow. Only allow-listed providers reach the backend.
    pub async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, ApiError> {
        let provider: OAuthProvider = provider.parse().map_err(|name: String| {
            tracing::warn!("Rejected OAuth provider {:?}", name);
            ApiError::UnsupportedProvider(name)
        })?;
        tracing::debug!("sign_in_with_oauth {}", provider);
        let url = self
            .backend
            .sign_in_with_oauth(provider, self.redirects.oauth.as_deref())
            .await
            .map_err(|e| surface("sign_in_with_oauth", e))?;
        Ok(OAuthRedirect { provider, url })
    }

    pub async fn get_current_session(&self) -> Result<Option<Session>, ApiError> {
        self.backend
            .get_session()
            .await
            .map_err(|e| surface("get_session", e))
    }

    pub async fn get_current_user(&self) -> Result<Option<User>, ApiError> {
        self.backend
            .get_user()
            .await
            .map_err(|e| surface("get_user", e))
    }

    pub async fn sign_out(&self) -> Result<(), ApiError> {
        tracing::debug!("sign_out");
        self.backend
            .sign_out()
            .await
            .map_err(|e| surface("sign_out", e))
    }

    pub async fn resend_verification_email(&self, email: &str) -> Result<(), ApiError> {
        self.backend
            .resend(
                ResendKind::Signup,
                email.trim(),
                self.redirects.email_confirmation.as_deref(),
            )
            .await
            .map_err(|e| surface("resend", e))
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        self.backend
            .reset_password_for_email(email.trim(), self.redirects.password_reset.as_deref())
            .await
            .map_err(|e| surface("reset_password_for_email", e))
    }

    pub async fn update_password(&self, new_password: &str) -> Result<User, ApiError> {
        let attributes = UserAttributes {
            password: Some(new_password.to_string()),
            ..Default::default()
        };
        self.backend
            .update_user(&attributes)
            .await
            .map_err(|e| surface("update_user", e))
    }

    /// Verified iff the fetched user has an email confirmation timestamp.
    pub async fn check_email_verification(&self) -> Result<EmailVerification, ApiError> {
        let user = self.get_current_user().await?;
        Ok(EmailVerification {
            is_verified: user.as_ref().is_some_and(User::is_email_confirmed),
            user,
        })
    }

    /// Register `callback` for auth changes. Dropping or unsubscribing the
    /// returned handle removes it from the backend exactly once.
    pub fn on_auth_state_change(
        &self,
        callback: impl Fn(AuthChangeEvent, Option<Session>) + Send + Sync + 'static,
    ) -> Subscription {
        self.backend.on_auth_state_change(Arc::new(callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use crate::error::{BackendError, GENERIC_ERROR_MESSAGE};
    use std::sync::Mutex;

    fn service() -> (AuthService<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        (AuthService::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_is_localized() {
        let (auth, backend) = service();
        backend.add_user("anna@example.org", "geheim123", true);

        let err = auth
            .sign_up_with_email("anna@example.org", "geheim123", SignUpOptions::default())
            .await
            .unwrap_err();

        assert!(err.message().contains("bereits registriert"));
        assert!(matches!(
            err,
            ApiError::Backend { status: Some(422), ref code, .. }
                if code.as_deref() == Some("user_already_exists")
        ));
    }

    #[tokio::test]
    async fn test_sign_up_unknown_error_passes_through() {
        let (auth, backend) = service();
        backend.fail_next(BackendError::api(500, "Database error saving new user"));

        let err = auth
            .sign_up_with_email("ben@example.org", "geheim123", SignUpOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.message(), "Database error saving new user");
    }

    #[tokio::test]
    async fn test_sign_up_uses_confirmation_redirect_and_returns_user() {
        let (auth, _backend) = service();
        let auth = auth.with_redirects(AuthRedirects {
            email_confirmation: Some("https://lernpfad.app/auth/callback".into()),
            ..Default::default()
        });

        let response = auth
            .sign_up_with_email(
                " ben@example.org ",
                "geheim123",
                SignUpOptions {
                    data: Some(serde_json::json!({"full_name": "Ben Weber"})),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let user = response.user.unwrap();
        assert_eq!(user.email.as_deref(), Some("ben@example.org"));
        assert_eq!(user.display_name(), "Ben Weber");
        assert!(response.session.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_passthrough() {
        let (auth, backend) = service();
        backend.add_user("anna@example.org", "geheim123", true);

        let err = auth
            .sign_in_with_email("anna@example.org", "falsch")
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Invalid login credentials");

        let session = auth
            .sign_in_with_email("anna@example.org", "geheim123")
            .await
            .unwrap();
        assert_eq!(session.user.email.as_deref(), Some("anna@example.org"));
        assert_eq!(
            auth.get_current_session().await.unwrap().unwrap().access_token,
            session.access_token
        );
    }

    #[tokio::test]
    async fn test_unsupported_oauth_provider_never_reaches_backend() {
        let (auth, backend) = service();

        let err = auth.sign_in_with_oauth("unsupported").await.unwrap_err();

        assert_eq!(err, ApiError::UnsupportedProvider("unsupported".into()));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_supported_oauth_provider_returns_redirect() {
        let (auth, backend) = service();
        let auth = auth.with_redirects(AuthRedirects {
            oauth: Some("https://lernpfad.app/auth/callback".into()),
            ..Default::default()
        });

        let redirect = auth.sign_in_with_oauth("GitHub").await.unwrap();

        assert_eq!(redirect.provider, OAuthProvider::Github);
        assert!(redirect.url.contains("provider=github"));
        assert!(redirect.url.contains("redirect_to=https://lernpfad.app/auth/callback"));
        assert_eq!(backend.call_count(BackendCall::SignInWithOAuth), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_reaches_backend_exactly_once() {
        let (auth, backend) = service();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let subscription = auth.on_auth_state_change(move |event, _| {
            sink.lock().unwrap().push(event);
        });
        assert_eq!(backend.listener_count(), 1);

        subscription.unsubscribe();

        assert_eq!(backend.call_count(BackendCall::Unsubscribe), 1);
        assert_eq!(backend.listener_count(), 0);

        backend.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(*events.lock().unwrap(), vec![AuthChangeEvent::InitialSession]);
    }

    #[tokio::test]
    async fn test_check_email_verification() {
        let (auth, backend) = service();

        // No user at all
        let status = auth.check_email_verification().await.unwrap();
        assert!(!status.is_verified);
        assert!(status.user.is_none());

        // Signed in, confirmed
        backend.add_user("anna@example.org", "geheim123", true);
        auth.sign_in_with_email("anna@example.org", "geheim123")
            .await
            .unwrap();
        let status = auth.check_email_verification().await.unwrap();
        assert!(status.is_verified);
        assert!(status.user.is_some());
    }

    fn session_for(user: User) -> Session {
        Session {
            access_token: "at".into(),
            refresh_token: "rt".into(),
            token_type: "bearer".into(),
            expires_in: 3600,
            expires_at: None,
            user,
        }
    }

    #[tokio::test]
    async fn test_unconfirmed_user_is_not_verified() {
        let (auth, backend) = service();
        let user = backend.add_user("dora@example.org", "geheim123", false);
        backend.emit(AuthChangeEvent::SignedIn, Some(session_for(user)));

        assert!(!auth.check_email_verification().await.unwrap().is_verified);

        backend.confirm_email("dora@example.org");
        assert!(auth.check_email_verification().await.unwrap().is_verified);
    }

    #[tokio::test]
    async fn test_auto_confirmed_sign_up_is_verified() {
        let backend = MemoryBackend::new().with_auto_confirm();
        let auth = AuthService::new(backend.clone());

        let response = auth
            .sign_up_with_email("carla@example.org", "geheim123", SignUpOptions::default())
            .await
            .unwrap();

        assert!(response.session.is_some());
        assert!(auth.check_email_verification().await.unwrap().is_verified);
    }

    #[tokio::test]
    async fn test_transport_failures_become_generic_message() {
        let (auth, backend) = service();
        let decode = serde_json::from_str::<u8>("x").unwrap_err();
        backend.fail_next(BackendError::from(decode));

        let err = auth.reset_password("anna@example.org").await.unwrap_err();

        assert_eq!(err.message(), GENERIC_ERROR_MESSAGE);
        assert_eq!(backend.call_count(BackendCall::ResetPassword), 1);
    }

    #[tokio::test]
    async fn test_update_password_requires_session() {
        let (auth, backend) = service();
        assert_eq!(
            auth.update_password("n3ues-Passwort").await.unwrap_err(),
            ApiError::NotAuthenticated
        );

        backend.add_user("anna@example.org", "geheim123", true);
        auth.sign_in_with_email("anna@example.org", "geheim123")
            .await
            .unwrap();
        let user = auth.update_password("n3ues-Passwort").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("anna@example.org"));

        auth.sign_out().await.unwrap();
        assert!(auth
            .sign_in_with_email("anna@example.org", "n3ues-Passwort")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_resend_and_sign_out_delegate_once() {
        let (auth, backend) = service();

        auth.resend_verification_email("anna@example.org")
            .await
            .unwrap();
        auth.sign_out().await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![BackendCall::Resend, BackendCall::SignOut]
        );
    }
}
