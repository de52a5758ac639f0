use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use super::{AuthBackend, AuthChangeEvent, AuthListener, ListenerRegistry, ProfileTable, Subscription};
use crate::error::BackendError;
use crate::models::{
    OAuthProvider, ResendKind, Session, SignUpOptions, SignUpResponse, User, UserAttributes,
    UserProfile,
};

/// Every backend entry point, as recorded by [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    SignUp,
    SignInWithPassword,
    SignInWithOAuth,
    GetSession,
    GetUser,
    SignOut,
    Subscribe,
    Unsubscribe,
    Resend,
    ResetPassword,
    UpdateUser,
    SelectProfile,
    InsertProfile,
    UpdateProfile,
    UpsertProfile,
    DeleteProfile,
}

/// In-memory backend for tests and for running the UI without a project.
///
/// Accounts, the session and profile rows live behind one mutex. Every call is
/// recorded, and [`fail_next`](MemoryBackend::fail_next) makes the next call
/// fail with a given error.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
    listeners: ListenerRegistry,
}

#[derive(Default)]
struct State {
    auto_confirm: bool,
    calls: Vec<BackendCall>,
    failures: VecDeque<BackendError>,
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    profiles: HashMap<Uuid, UserProfile>,
}

struct Account {
    user: User,
    password: String,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign-ups return a session right away, as with email confirmation off.
    pub fn with_auto_confirm(self) -> Self {
        self.lock().auto_confirm = true;
        self
    }

    /// Seed an account.
    pub fn add_user(&self, email: &str, password: &str, confirmed: bool) -> User {
        let user = new_user(email, None, confirmed);
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    pub fn confirm_email(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(email) {
            account.user.email_confirmed_at = Some(Utc::now());
        }
    }

    /// Make the next recorded call fail with `error`.
    pub fn fail_next(&self, error: BackendError) {
        self.lock().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, call: BackendCall) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn profile(&self, user_id: Uuid) -> Option<UserProfile> {
        self.lock().profiles.get(&user_id).cloned()
    }

    /// Simulate a server-side auth event (expiry, sign-out in another tab, ...).
    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        self.lock().session = session.clone();
        self.listeners.emit(event, session.as_ref());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record `call` and pop a scripted failure, if any.
    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn start_session(&self, user: User) -> Session {
        let session = new_session(user);
        self.lock().session = Some(session.clone());
        self.listeners
            .emit(AuthChangeEvent::SignedIn, Some(&session));
        session
    }
}

fn new_user(email: &str, metadata: Option<serde_json::Value>, confirmed: bool) -> User {
    User {
        id: Uuid::new_v4(),
        email: Some(email.to_string()),
        phone: None,
        email_confirmed_at: confirmed.then(Utc::now),
        last_sign_in_at: None,
        created_at: Some(Utc::now()),
        user_metadata: metadata.unwrap_or_else(|| serde_json::json!({})),
        app_metadata: serde_json::json!({ "provider": "email" }),
    }
}

fn new_session(user: User) -> Session {
    Session {
        access_token: format!("memory-{}", Uuid::new_v4()),
        refresh_token: Uuid::new_v4().to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: Some(Utc::now().timestamp() + 3600),
        user,
    }
}

impl AuthBackend for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: &SignUpOptions,
    ) -> Result<SignUpResponse, BackendError> {
        self.record(BackendCall::SignUp)?;

        let (user, auto_confirm) = {
            let mut state = self.lock();
            if state.accounts.contains_key(email) {
                return Err(BackendError::Api {
                    status: 422,
                    code: Some("user_already_exists".to_string()),
                    message: "User already registered".to_string(),
                });
            }
            let auto_confirm = state.auto_confirm;
            let user = new_user(email, options.data.clone(), auto_confirm);
            state.accounts.insert(
                email.to_string(),
                Account {
                    user: user.clone(),
                    password: password.to_string(),
                },
            );
            (user, auto_confirm)
        };

        let session = auto_confirm.then(|| self.start_session(user.clone()));
        Ok(SignUpResponse {
            user: Some(user),
            session,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.record(BackendCall::SignInWithPassword)?;

        let user = {
            let state = self.lock();
            match state.accounts.get(email) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(BackendError::api(400, "Invalid login credentials")),
            }
        };
        if !user.is_email_confirmed() {
            return Err(BackendError::api(400, "Email not confirmed"));
        }
        Ok(self.start_session(user))
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: Option<&str>,
    ) -> Result<String, BackendError> {
        self.record(BackendCall::SignInWithOAuth)?;
        let mut url = format!("memory://authorize?provider={provider}");
        if let Some(redirect) = redirect_to {
            url.push_str("&redirect_to=");
            url.push_str(redirect);
        }
        Ok(url)
    }

    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        self.record(BackendCall::GetSession)?;
        Ok(self.lock().session.clone())
    }

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        self.record(BackendCall::GetUser)?;
        let state = self.lock();
        Ok(state.session.as_ref().map(|session| {
            // Account data is fresher than the copy inside the session.
            state
                .accounts
                .values()
                .find(|a| a.user.id == session.user.id)
                .map(|a| a.user.clone())
                .unwrap_or_else(|| session.user.clone())
        }))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record(BackendCall::SignOut)?;
        self.lock().session = None;
        self.listeners.emit(AuthChangeEvent::SignedOut, None);
        Ok(())
    }

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription {
        self.lock().calls.push(BackendCall::Subscribe);
        let inner = self
            .listeners
            .subscribe(listener, || self.lock().session.clone());

        let state = self.state.clone();
        Subscription::new(move || {
            state
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .calls
                .push(BackendCall::Unsubscribe);
            inner.unsubscribe();
        })
    }

    async fn resend(
        &self,
        _kind: ResendKind,
        _email: &str,
        _redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::Resend)
    }

    async fn reset_password_for_email(
        &self,
        _email: &str,
        _redirect_to: Option<&str>,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::ResetPassword)
    }

    async fn update_user(&self, attributes: &UserAttributes) -> Result<User, BackendError> {
        self.record(BackendCall::UpdateUser)?;

        let session = {
            let mut state = self.lock();
            let session = state.session.clone().ok_or(BackendError::MissingSession)?;
            let account = state
                .accounts
                .values_mut()
                .find(|a| a.user.id == session.user.id)
                .ok_or_else(|| BackendError::api(404, "User not found"))?;

            if let Some(password) = &attributes.password {
                if *password == account.password {
                    return Err(BackendError::api(
                        422,
                        "New password should be different from the old password.",
                    ));
                }
                account.password = password.clone();
            }
            if let Some(email) = &attributes.email {
                account.user.email = Some(email.clone());
            }
            if let Some(data) = &attributes.data {
                account.user.user_metadata = data.clone();
            }

            let updated = Session {
                user: account.user.clone(),
                ..session
            };
            state.session = Some(updated.clone());
            updated
        };

        self.listeners
            .emit(AuthChangeEvent::UserUpdated, Some(&session));
        Ok(session.user)
    }
}

impl ProfileTable for MemoryBackend {
    async fn select_profile(&self, user_id: Uuid) -> Result<Option<UserProfile>, BackendError> {
        self.record(BackendCall::SelectProfile)?;
        Ok(self.lock().profiles.get(&user_id).cloned())
    }

    async fn insert_profile(&self, row: &UserProfile) -> Result<UserProfile, BackendError> {
        self.record(BackendCall::InsertProfile)?;
        let mut state = self.lock();
        if state.profiles.contains_key(&row.id) {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23505".to_string()),
                message: "duplicate key value violates unique constraint \"user_profiles_pkey\""
                    .to_string(),
            });
        }
        let now = Utc::now();
        let stored = UserProfile {
            created_at: Some(now),
            updated_at: Some(now),
            ..row.clone()
        };
        state.profiles.insert(row.id, stored.clone());
        Ok(stored)
    }

    async fn update_profile(&self, row: &UserProfile) -> Result<UserProfile, BackendError> {
        self.record(BackendCall::UpdateProfile)?;
        let mut state = self.lock();
        let existing = state
            .profiles
            .get_mut(&row.id)
            .ok_or_else(|| BackendError::api(404, "Profile not found"))?;
        *existing = UserProfile {
            created_at: existing.created_at,
            updated_at: Some(Utc::now()),
            ..row.clone()
        };
        Ok(existing.clone())
    }

    async fn upsert_profile(&self, row: &UserProfile) -> Result<UserProfile, BackendError> {
        self.record(BackendCall::UpsertProfile)?;
        let mut state = self.lock();
        let now = Utc::now();
        let created_at = state
            .profiles
            .get(&row.id)
            .and_then(|p| p.created_at)
            .unwrap_or(now);
        let stored = UserProfile {
            created_at: Some(created_at),
            updated_at: Some(now),
            ..row.clone()
        };
        state.profiles.insert(row.id, stored.clone());
        Ok(stored)
    }

    async fn delete_profile(&self, user_id: Uuid) -> Result<(), BackendError> {
        self.record(BackendCall::DeleteProfile)?;
        self.lock().profiles.remove(&user_id);
        Ok(())
    }
}
