//! # Auth context: process-wide session state
//!
//! The auth context owns the one copy of "who is signed in" that the UI reads.
//! It has four phases:
//!
//! ```text
//! Uninitialized ──mount──▶ Loading ──session──▶ Authenticated
//!                              │                   ▲      │
//!                              └──none / error──▶ Unauthenticated
//!                                                  (events move between the two)
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Mount**: [`AuthDriver::run`] publishes `Loading` and fetches the session
//!    once. The loading phase always ends, whether the fetch succeeds or fails.
//! 2. **Subscribe**: only after that fetch completes, the driver registers an
//!    auth-change listener. `SIGNED_OUT` or an event without a session clears
//!    the state. Any event carrying a session sets it.
//! 3. **Unmount**: [`AuthHandle::unmount`] stops the driver, which then
//!    unsubscribes.
//!
//! ## Single writer
//!
//! The driver is the only code that mutates [`AuthState`]. The backend listener
//! does nothing but send an [`AuthMessage`] into the driver's channel, and the
//! driver applies messages one at a time. Once the driver has seen `Unmount`
//! its receiver is gone, so a callback that fires late has nowhere to deliver
//! to and cannot touch the state. A mount flag would only make that a
//! convention.

use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use super::AuthService;
use crate::backend::{AuthBackend, AuthChangeEvent};
use crate::error::ApiError;
use crate::models::{Session, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthPhase {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the auth context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub phase: AuthPhase,
    pub session: Option<Session>,
}

impl AuthState {
    pub fn loading() -> Self {
        Self {
            phase: AuthPhase::Loading,
            session: None,
        }
    }

    pub fn authenticated(session: Session) -> Self {
        Self {
            phase: AuthPhase::Authenticated,
            session: Some(session),
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            phase: AuthPhase::Unauthenticated,
            session: None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, AuthPhase::Uninitialized | AuthPhase::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == AuthPhase::Authenticated
    }

    /// State after the mount-time session fetch.
    fn hydrated(result: Result<Option<Session>, ApiError>) -> Self {
        match result {
            Ok(Some(session)) => Self::authenticated(session),
            Ok(None) => Self::unauthenticated(),
            Err(e) => {
                tracing::error!("Initial session fetch failed: {}", e);
                Self::unauthenticated()
            }
        }
    }

    /// State after an auth-change event.
    fn on_event(event: AuthChangeEvent, session: Option<Session>) -> Self {
        match (event, session) {
            (AuthChangeEvent::SignedOut, _) | (_, None) => Self::unauthenticated(),
            (_, Some(session)) => Self::authenticated(session),
        }
    }
}

/// Messages accepted by the driver.
#[derive(Debug)]
pub enum AuthMessage {
    Changed(AuthChangeEvent, Option<Session>),
    Unmount,
}

/// Cheap handle the UI keeps to stop the driver.
#[derive(Debug, Clone)]
pub struct AuthHandle {
    tx: UnboundedSender<AuthMessage>,
}

impl AuthHandle {
    pub fn unmount(&self) {
        // The driver may already be gone; nothing left to stop then.
        let _ = self.tx.send(AuthMessage::Unmount);
    }
}

/// The single writer of [`AuthState`].
pub struct AuthDriver {
    tx: UnboundedSender<AuthMessage>,
    rx: UnboundedReceiver<AuthMessage>,
}

impl AuthDriver {
    pub fn new() -> (AuthHandle, AuthDriver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AuthHandle { tx: tx.clone() }, AuthDriver { tx, rx })
    }

    /// Run the mount → hydrate → subscribe → unmount sequence, handing every
    /// new state to `publish`. Returns after unmount.
    pub async fn run<B: AuthBackend>(
        mut self,
        service: &AuthService<B>,
        mut publish: impl FnMut(&AuthState),
    ) {
        let mut state = AuthState::loading();
        publish(&state);

        let hydrated = service.get_current_session().await;

        // Unmounted while the fetch was in flight: drop the result.
        if let Ok(AuthMessage::Unmount) | Err(TryRecvError::Disconnected) = self.rx.try_recv() {
            tracing::debug!("Auth context unmounted during hydration");
            return;
        }

        state = AuthState::hydrated(hydrated);
        tracing::debug!("Auth context hydrated: {:?}", state.phase);
        publish(&state);

        let tx = self.tx.clone();
        let subscription = service.on_auth_state_change(move |event, session| {
            let _ = tx.send(AuthMessage::Changed(event, session));
        });

        while let Some(message) = self.rx.recv().await {
            match message {
                AuthMessage::Unmount => break,
                AuthMessage::Changed(event, session) => {
                    let next = AuthState::on_event(event, session);
                    if next != state {
                        tracing::debug!("Auth event {:?}: {:?} -> {:?}", event, state.phase, next.phase);
                        state = next;
                        publish(&state);
                    }
                }
            }
        }

        subscription.unsubscribe();
        tracing::debug!("Auth context unmounted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use crate::error::BackendError;

    fn service() -> (AuthService<MemoryBackend>, MemoryBackend) {
        let backend = MemoryBackend::new();
        (AuthService::new(backend.clone()), backend)
    }

    #[test]
    fn test_state_transitions() {
        assert!(AuthState::default().is_loading());
        assert!(AuthState::loading().is_loading());
        assert!(!AuthState::unauthenticated().is_loading());

        assert_eq!(
            AuthState::hydrated(Err(ApiError::unexpected())),
            AuthState::unauthenticated()
        );
        assert_eq!(AuthState::hydrated(Ok(None)), AuthState::unauthenticated());
        assert_eq!(
            AuthState::on_event(AuthChangeEvent::TokenRefreshed, None),
            AuthState::unauthenticated()
        );
    }

    #[tokio::test]
    async fn test_hydrates_then_follows_events_until_unmount() {
        let (auth, backend) = service();
        backend.add_user("anna@example.org", "geheim123", true);
        let session = auth
            .sign_in_with_email("anna@example.org", "geheim123")
            .await
            .unwrap();

        let (handle, driver) = AuthDriver::new();
        let mut states = Vec::new();

        tokio::join!(
            driver.run(&auth, |s| states.push(s.clone())),
            async {
                tokio::task::yield_now().await;
                backend.emit(AuthChangeEvent::SignedOut, None);
                handle.unmount();
            }
        );

        assert_eq!(
            states,
            vec![
                AuthState::loading(),
                AuthState::authenticated(session),
                AuthState::unauthenticated(),
            ]
        );
        assert_eq!(backend.call_count(BackendCall::Subscribe), 1);
        assert_eq!(backend.call_count(BackendCall::Unsubscribe), 1);
        assert_eq!(backend.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_hydration_ends_unauthenticated() {
        let (auth, backend) = service();
        backend.fail_next(BackendError::api(500, "boom"));

        let (handle, driver) = AuthDriver::new();
        let mut states = Vec::new();

        tokio::join!(driver.run(&auth, |s| states.push(s.clone())), async {
            tokio::task::yield_now().await;
            handle.unmount();
        });

        assert_eq!(states.last(), Some(&AuthState::unauthenticated()));
        assert!(!states.last().unwrap().is_loading());
        assert_eq!(backend.call_count(BackendCall::Subscribe), 1);
    }

    #[tokio::test]
    async fn test_sign_in_event_authenticates() {
        let (auth, backend) = service();
        backend.add_user("anna@example.org", "geheim123", true);

        let (handle, driver) = AuthDriver::new();
        let mut states = Vec::new();

        tokio::join!(driver.run(&auth, |s| states.push(s.clone())), async {
            tokio::task::yield_now().await;
            auth.sign_in_with_email("anna@example.org", "geheim123")
                .await
                .unwrap();
            handle.unmount();
        });

        let last = states.last().unwrap();
        assert!(last.is_authenticated());
        assert_eq!(
            last.user().and_then(|u| u.email.as_deref()),
            Some("anna@example.org")
        );
    }

    #[tokio::test]
    async fn test_events_after_unmount_are_ignored() {
        let (auth, backend) = service();
        backend.add_user("anna@example.org", "geheim123", true);

        let (handle, driver) = AuthDriver::new();
        let mut states = Vec::new();

        tokio::join!(driver.run(&auth, |s| states.push(s.clone())), async {
            tokio::task::yield_now().await;
            handle.unmount();
        });
        let published = states.len();

        // Late events after unmount: nobody is listening any more.
        auth.sign_in_with_email("anna@example.org", "geheim123")
            .await
            .unwrap();
        backend.emit(AuthChangeEvent::SignedOut, None);
        handle.unmount();

        assert_eq!(states.len(), published);
        assert_eq!(states.last(), Some(&AuthState::unauthenticated()));
        assert_eq!(backend.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_unmount_during_hydration_skips_subscription() {
        let (auth, backend) = service();
        let (handle, driver) = AuthDriver::new();
        let mut states = Vec::new();

        handle.unmount();
        driver.run(&auth, |s| states.push(s.clone())).await;

        assert_eq!(states, vec![AuthState::loading()]);
        assert_eq!(backend.call_count(BackendCall::Subscribe), 0);
        assert_eq!(backend.call_count(BackendCall::GetSession), 1);
    }
}
