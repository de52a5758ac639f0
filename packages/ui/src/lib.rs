//! This crate contains all shared UI for the workspace: the auth and theme
//! providers, their hooks and the small controls built on them.

// Re-export icon library
pub use dioxus_free_icons::Icon;

mod prefs;
pub use prefs::{make_preference_store, SharedStore};

mod auth;
pub use auth::{use_auth, use_auth_service, use_profile_api, AuthProvider, LogoutButton, OAuthButton};

mod theme;
pub use theme::{apply_theme, use_theme, ThemeProvider, ThemeSelector, ThemeSignal};

pub use api::{AuthPhase, AuthState};
