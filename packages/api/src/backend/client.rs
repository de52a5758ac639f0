//! # REST client for the hosted backend
//!
//! [`BackendClient`] implements [`AuthBackend`] against the auth REST API
//! (`{url}/auth/v1`) and [`ProfileTable`] against the table REST API
//! (`{url}/rest/v1/user_profiles`).
//!
//! ## Session handling
//!
//! The client owns the session, the way the backend's JS SDK does:
//!
//! - Sign-in and sign-up (with auto-confirm) store the returned session, persist
//!   it as JSON under [`store::SESSION_KEY`] and emit `SIGNED_IN`.
//! - [`get_session`](AuthBackend::get_session) returns the held session. If it
//!   has expired it is refreshed once with the refresh token, which emits
//!   `TOKEN_REFRESHED`. A rejected refresh clears the session and emits
//!   `SIGNED_OUT`.
//! - [`sign_out`](AuthBackend::sign_out) revokes the token server-side, then
//!   clears the local copy and emits `SIGNED_OUT`. A 401/403/404 from the
//!   logout endpoint means the token is already gone and still counts as
//!   success.
//!
//! Table requests carry the session's access token so row-level security sees
//! the user, and fall back to the anon key otherwise.
//!
//! ## Errors
//!
//! Non-2xx responses are decoded into [`BackendError::Api`]. The auth API uses
//! `msg` / `error_description`, the table API uses `message`, and both are
//! understood.

use std::sync::{Arc, Mutex};

use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use store::{PreferenceStore, SESSION_KEY};
use uuid::Uuid;

use super::{AuthBackend, AuthChangeEvent, AuthListener, ListenerRegistry, ProfileTable, Subscription};
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::models::{
    OAuthProvider, ResendKind, Session, SignUpOptions, SignUpResponse, User, UserAttributes,
    UserProfile,
};

const PROFILES_TABLE: &str = "user_profiles";

/// Shared, cheaply clonable client. Clones share session and listeners.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: BackendConfig,
    http: reqwest::Client,
    session: Mutex<Option<Session>>,
    listeners: ListenerRegistry,
    storage: Option<Arc<dyn PreferenceStore + Send + Sync>>,
}

impl BackendClient {
    /// Create a client that keeps the session in memory only.
    pub fn new(config: BackendConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a client that persists the session and restores a previously
    /// stored one.
    pub fn with_storage(
        config: BackendConfig,
        storage: Arc<dyn PreferenceStore + Send + Sync>,
    ) -> Self {
        Self::build(config, Some(storage))
    }

    fn build(
        config: BackendConfig,
        storage: Option<Arc<dyn PreferenceStore + Send + Sync>>,
    ) -> Self {
        let restored = storage.as_ref().and_then(|s| restore_session(s.as_ref()));
        if restored.is_some() {
            tracing::debug!("Restored persisted session");
        }
        Self {
            inner: Arc::new(Inner {
                config,
                http: reqwest::Client::new(),
                session: Mutex::new(restored),
                listeners: ListenerRegistry::default(),
                storage,
            }),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.inner.config
    }

    fn current_session(&self) -> Option<Session> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the held session, persist it and notify listeners.
    fn set_session(&self, session: Option<Session>, event: AuthChangeEvent) {
        *self.inner.session.lock().unwrap_or_else(|e| e.into_inner()) = session.clone();

        if let Some(storage) = &self.inner.storage {
            match &session {
                Some(s) => match serde_json::to_string(s) {
                    Ok(raw) => storage.set(SESSION_KEY, &raw),
                    Err(e) => tracing::warn!("Failed to serialise session: {}", e),
                },
                None => storage.remove(SESSION_KEY),
            }
        }

        self.inner.listeners.emit(event, session.as_ref());
    }

    fn auth_endpoint(&self, path: &str) -> String {
        format!("{}{}", self.inner.config.auth_url(), path)
    }

    fn table_endpoint(&self) -> String {
        format!("{}/{}", self.inner.config.rest_url(), PROFILES_TABLE)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.inner
            .http
            .request(method, url)
            .header("apikey", self.inner.config.anon_key.as_str())
    }

    /// Request carrying the user's token, or the anon key without a session.
    fn table_request(&self, method: Method, query: &[(&str, String)]) -> RequestBuilder {
        let token = self
            .current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.inner.config.anon_key.clone());
        self.request(method, &self.table_endpoint())
            .query(query)
            .bearer_auth(token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let url = self.auth_endpoint("/token?grant_type=refresh_token");
        let session: Session = send_json(
            self.request(Method::POST, &url)
                .json(&json!({ "refresh_token": refresh_token })),
        )
        .await?;
        Ok(session.with_expiry_from(now()))
    }
}

fn restore_session(storage: &dyn PreferenceStore) -> Option<Session> {
    let raw = storage.get(SESSION_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!("Discarding unreadable persisted session: {}", e);
            storage.remove(SESSION_KEY);
            None
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn id_filter(user_id: Uuid) -> (&'static str, String) {
    ("id", format!("eq.{user_id}"))
}

/// Build the authorize URL for an OAuth provider.
pub(crate) fn authorize_url(
    config: &BackendConfig,
    provider: OAuthProvider,
    redirect_to: Option<&str>,
) -> Result<String, BackendError> {
    let mut params = vec![("provider", provider.as_str())];
    if let Some(redirect) = redirect_to {
        params.push(("redirect_to", redirect));
    }
    let url = Url::parse_with_params(&format!("{}/authorize", config.auth_url()), &params)
        .map_err(|e| BackendError::Config(format!("backend URL: {e}")))?;
    Ok(url.to_string())
}

/// Error body shapes of the auth and table APIs.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
    code: Option<serde_json::Value>,
}

pub(crate) fn parse_error(status: u16, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error_code.or_else(|| match parsed.code {
        Some(serde_json::Value::String(code)) => Some(code),
        _ => None,
    });
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                format!("HTTP {status}")
            } else {
                body.to_string()
            }
        });
    BackendError::Api {
        status,
        code,
        message,
    }
}

async fn send(builder: RequestBuilder) -> Result<String, BackendError> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(parse_error(status.as_u16(), &body))
    }
}

async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
    let body = send(builder).await?;
    Ok(serde_json::from_str(&body)?)
}

/// Decode a `return=representation` array and take its single row.
async fn send_row(builder: RequestBuilder) -> Result<UserProfile, BackendError> {
    let rows: Vec<UserProfile> = send_json(builder).await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::api(404, "Profile not found"))
}

/// Sign-up answers with a session under auto-confirm and a bare user otherwise.
pub(crate) fn parse_sign_up(body: serde_json::Value) -> Result<SignUpResponse, BackendError> {
    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body)?;
        let session = session.with_expiry_from(now());
        Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    } else {
        let user: User = serde_json::from_value(body)?;
        Ok(SignUpResponse {
            user: Some(user),
            session: None,
        })
    }
}

impl AuthBackend for BackendClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: &SignUpOptions,
    ) -> Result<SignUpResponse, BackendError> {
        let mut builder = self.request(Method::POST, &self.auth_endpoint("/signup"));
        if let Some(redirect) = &options.email_redirect_to {
            builder = builder.query(&[("redirect_to", redirect)]);
        }
        let body: serde_json::Value = send_json(builder.json(&json!({
            "email": email,
            "password": password,
            "data": options.data.clone().unwrap_or_else(|| json!({})),
        })))
        .await?;

        let response = parse_sign_up(body)?;
        if let Some(session) = &response.session {
            self.set_session(Some(session.clone()), AuthChangeEvent::SignedIn);
        }
        Ok(response)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let url = self.auth_endpoint("/token?grant_type=password");
        let session: Session = send_json(
            self.request(Method::POST, &url)
                .json(&json!({ "email": email, "password": password })),
        )
        .await?;
        let session = session.with_expiry_from(now());
        self.set_session(Some(session.clone()), AuthChangeEvent::SignedIn);
        Ok(session)
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: Option<&str>,
    ) -> Result<String, BackendError> {
        authorize_url(&self.inner.config, provider, redirect_to)
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };
        if !session.is_expired(now()) {
            return Ok(Some(session));
        }

        tracing::debug!("Session expired, refreshing");
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.set_session(Some(fresh.clone()), AuthChangeEvent::TokenRefreshed);
                Ok(Some(fresh))
            }
            Err(e @ BackendError::Api { .. }) => {
                self.set_session(None, AuthChangeEvent::SignedOut);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        let Some(session) = self.get_session().await? else {
            return Ok(None);
        };
        let user = send_json(
            self.request(Method::GET, &self.auth_endpoint("/user"))
                .bearer_auth(&session.access_token),
        )
        .await?;
        Ok(Some(user))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.current_session() {
            let result = send(
                self.request(Method::POST, &self.auth_endpoint("/logout"))
                    .bearer_auth(&session.access_token),
            )
            .await;
            match result {
                Ok(_) => {}
                Err(BackendError::Api { status, .. }) if matches!(status, 401 | 403 | 404) => {
                    tracing::debug!("Token already revoked ({})", status);
                }
                Err(e) => return Err(e),
            }
        }
        self.set_session(None, AuthChangeEvent::SignedOut);
        Ok(())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.inner
            .listeners
            .subscribe(listener, || self.current_session())
    }

    async fn resend(
        &self,
        kind: ResendKind,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut builder = self.request(Method::POST, &self.auth_endpoint("/resend"));
        if let Some(redirect) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect)]);
        }
        send(builder.json(&json!({ "type": kind, "email": email }))).await?;
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut builder = self.request(Method::POST, &self.auth_endpoint("/recover"));
        if let Some(redirect) = redirect_to {
            builder = builder.query(&[("redirect_to", redirect)]);
        }
        send(builder.json(&json!({ "email": email }))).await?;
        Ok(())
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, BackendError> {
        let session = self
            .get_session()
            .await?
            .ok_or(BackendError::MissingSession)?;
        let user: User = send_json(
            self.request(Method::PUT, &self.auth_endpoint("/user"))
                .bearer_auth(&session.access_token)
                .json(attributes),
        )
        .await?;

        let updated = Session {
            user: user.clone(),
            ..session
        };
        self.set_session(Some(updated), AuthChangeEvent::UserUpdated);
        Ok(user)
    }
}

impl ProfileTable for BackendClient {
    async fn select_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, BackendError> {
        let rows: Vec<UserProfile> = send_json(self.table_request(
            Method::GET,
            &[id_filter(user_id), ("select", "*".to_string())],
        ))
        .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_profile(&self, row: &UserProfile) -> Result<UserProfile, BackendError> {
        send_row(
            self.table_request(Method::POST, &[])
                .header("Prefer", "return=representation")
                .json(row),
        )
        .await
    }

    async fn update_profile(&self, row: &UserProfile) -> Result<UserProfile, BackendError> {
        send_row(
            self.table_request(Method::PATCH, &[id_filter(row.id)])
                .header("Prefer", "return=representation")
                .json(row),
        )
        .await
    }

    async fn upsert_profile(&self, row: &UserProfile) -> Result<UserProfile, BackendError> {
        send_row(
            self.table_request(Method::POST, &[])
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(row),
        )
        .await
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), BackendError> {
        send(self.table_request(Method::DELETE, &[id_filter(user_id)])).await?;
        Ok(())
    }
}
