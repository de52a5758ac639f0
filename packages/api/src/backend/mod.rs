//! # Backend seam
//!
//! The façades never speak HTTP themselves. They are generic over two traits
//! that describe the slice of the hosted backend the app consumes:
//!
//! | Trait | Backend surface |
//! |-------|-----------------|
//! | [`AuthBackend`] | `signUp`, `signInWithPassword`, `signInWithOAuth`, `getSession`, `getUser`, `signOut`, `onAuthStateChange`, `resend`, `resetPasswordForEmail`, `updateUser` |
//! | [`ProfileTable`] | `select` / `insert` / `update` / `upsert` / `delete` on `user_profiles` |
//!
//! Two implementations exist:
//!
//! - [`BackendClient`]: the real thing, REST over `reqwest`. It holds the
//!   session, persists it through a [`store::PreferenceStore`] and emits
//!   [`AuthChangeEvent`]s.
//! - [`MemoryBackend`]: in-memory, counts calls and can be scripted to fail.
//!   It is used by the tests and for running the UI without a backend.
//!
//! ## Auth change events
//!
//! Listeners are `Fn(AuthChangeEvent, Option<Session>)` closures kept in a
//! [`ListenerRegistry`]. Subscribing returns a [`Subscription`] that removes
//! the listener exactly once, when [`Subscription::unsubscribe`] is called or
//! when the subscription is dropped, whichever comes first. A new listener
//! immediately receives `INITIAL_SESSION` with the current session.

use std::future::Future;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BackendError;
use crate::models::{
    OAuthProvider, ResendKind, Session, SignUpOptions, SignUpResponse, User, UserAttributes,
    UserProfile,
};

mod client;
mod memory;

pub use client::BackendClient;
pub use memory::{BackendCall, MemoryBackend};

/// Auth state change kinds, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// Callback invoked on every auth state change.
pub type AuthListener = Arc<dyn Fn(AuthChangeEvent, Option<Session>) + Send + Sync>;

/// Async interface to the hosted auth API.
pub trait AuthBackend {
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        options: &SignUpOptions,
    ) -> impl Future<Output = Result<SignUpResponse, BackendError>>;

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, BackendError>>;

    /// Returns the provider's authorize URL. Builds a URL only and sends no
    /// request.
    fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: Option<&str>,
    ) -> impl Future<Output = Result<String, BackendError>>;

    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, BackendError>>;

    fn get_user(&self) -> impl Future<Output = Result<Option<User>, BackendError>>;

    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>>;

    fn on_auth_state_change(&self, listener: AuthListener) -> Subscription;

    fn resend(
        &self,
        kind: ResendKind,
        email: &str,
        redirect_to: Option<&str>,
    ) -> impl Future<Output = Result<(), BackendError>>;

    fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: Option<&str>,
    ) -> impl Future<Output = Result<(), BackendError>>;

    fn update_user(
        &self,
        attributes: &UserAttributes,
    ) -> impl Future<Output = Result<User, BackendError>>;
}

/// Async interface to the `user_profiles` table.
pub trait ProfileTable {
    fn select_profile(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = Result<Option<UserProfile>, BackendError>>;

    fn insert_profile(
        &self,
        row: &UserProfile,
    ) -> impl Future<Output = Result<UserProfile, BackendError>>;

    fn update_profile(
        &self,
        row: &UserProfile,
    ) -> impl Future<Output = Result<UserProfile, BackendError>>;

    fn upsert_profile(
        &self,
        row: &UserProfile,
    ) -> impl Future<Output = Result<UserProfile, BackendError>>;

    fn delete_profile(&self, user_id: Uuid) -> impl Future<Output = Result<(), BackendError>>;
}

/// Handle returned by `on_auth_state_change`.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}

/// Shared list of auth listeners.
///
/// Delivery is serialised: an `INITIAL_SESSION` and any concurrent
/// [`emit`](Self::emit) never interleave, so a new listener never sees a
/// snapshot older than an event it already received. Callbacks must not
/// subscribe or emit on the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
    delivery: Arc<Mutex<()>>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, AuthListener)>,
}

impl ListenerRegistry {
    /// Register `listener` and deliver `INITIAL_SESSION` with the session
    /// read by `current` after registration.
    pub fn subscribe(
        &self,
        listener: AuthListener,
        current: impl FnOnce() -> Option<Session>,
    ) -> Subscription {
        let _delivery = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
        let id = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push((id, listener.clone()));
            id
        };
        listener(AuthChangeEvent::InitialSession, current());

        let registry = self.clone();
        Subscription::new(move || registry.remove(id))
    }

    fn remove(&self, id: u64) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .retain(|(entry_id, _)| *entry_id != id);
    }

    /// Call every listener. The listener list is unlocked before any
    /// callback runs.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<&Session>) {
        let _delivery = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
        let listeners: Vec<AuthListener> = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        tracing::debug!("Auth event {:?} to {} listener(s)", event, listeners.len());
        for listener in listeners {
            listener(event, session.cloned());
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(
        events: Arc<Mutex<Vec<AuthChangeEvent>>>,
    ) -> AuthListener {
        Arc::new(move |event, _| events.lock().unwrap().push(event))
    }

    #[test]
    fn test_event_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuthChangeEvent::SignedOut).unwrap(),
            "\"SIGNED_OUT\""
        );
        assert_eq!(
            serde_json::from_str::<AuthChangeEvent>("\"TOKEN_REFRESHED\"").unwrap(),
            AuthChangeEvent::TokenRefreshed
        );
    }

    #[test]
    fn test_subscription_runs_unsubscribe_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        subscription.unsubscribe();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_subscription_unsubscribes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        {
            let _subscription = Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_delivers_initial_session_then_events() {
        let registry = ListenerRegistry::default();
        let events = Arc::new(Mutex::new(Vec::new()));

        let subscription = registry.subscribe(counting_listener(events.clone()), || None);
        assert_eq!(registry.len(), 1);

        registry.emit(AuthChangeEvent::SignedOut, None);
        assert_eq!(
            *events.lock().unwrap(),
            vec![AuthChangeEvent::InitialSession, AuthChangeEvent::SignedOut]
        );

        subscription.unsubscribe();
        assert!(registry.is_empty());

        registry.emit(AuthChangeEvent::SignedIn, None);
        assert_eq!(events.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_initial_session_is_read_after_registration() {
        let registry = ListenerRegistry::default();
        let seen = registry.clone();
        let registered = Arc::new(AtomicUsize::new(0));
        let count = registered.clone();

        let _subscription = registry.subscribe(Arc::new(|_, _| {}), move || {
            count.store(seen.len(), Ordering::SeqCst);
            None
        });

        assert_eq!(registered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_emit_never_precedes_initial_session() {
        let registry = ListenerRegistry::default();
        let events = Arc::new(Mutex::new(Vec::new()));
        let emitter = registry.clone();

        let handle = std::thread::spawn(move || {
            for _ in 0..100 {
                emitter.emit(AuthChangeEvent::SignedOut, None);
            }
        });
        let _subscription = registry.subscribe(counting_listener(events.clone()), || None);
        handle.join().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.first(), Some(&AuthChangeEvent::InitialSession));
        assert!(events[1..].iter().all(|e| *e == AuthChangeEvent::SignedOut));
    }

    #[test]
    fn test_unsubscribe_removes_only_own_listener() {
        let registry = ListenerRegistry::default();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        let a = registry.subscribe(counting_listener(first.clone()), || None);
        let _b = registry.subscribe(counting_listener(second.clone()), || None);

        a.unsubscribe();
        registry.emit(AuthChangeEvent::UserUpdated, None);

        assert_eq!(first.lock().unwrap().len(), 1);
        assert_eq!(second.lock().unwrap().len(), 2);
    }
}
