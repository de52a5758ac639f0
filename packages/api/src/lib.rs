//! # API crate: client-side façades over the hosted backend for Lernpfad
//!
//! This crate is everything the Lernpfad frontends know about the hosted
//! backend-as-a-service. UI code never builds a request itself. It calls one of
//! the façades below and renders the `Result`.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | `AuthService` façade (sign-up/in/out, OAuth, verification, password reset) and the auth context actor |
//! | [`backend`] | `AuthBackend` / `ProfileTable` traits, the `reqwest` client and an in-memory backend |
//! | [`config`] | Backend URL, anon key and site URL from the environment |
//! | [`error`] | `BackendError` (transport) and `ApiError` (user-facing) |
//! | [`models`] | `User`, `Session`, `UserProfile` and the profile input shapes |
//! | [`profile`] | `ProfileApi`, CRUD on `user_profiles` for the signed-in user |
//! | [`theme`] | `ThemeContext`, the local and remote theme preference |
//!
//! ## Result convention
//!
//! Every façade operation returns `Result<T, ApiError>`. The `Err` side's
//! `Display` is the message meant for the user. Transport failures are logged
//! and replaced by a generic German message.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod profile;
pub mod theme;

pub use auth::{AuthDriver, AuthHandle, AuthPhase, AuthRedirects, AuthService, AuthState};
pub use backend::{AuthChangeEvent, BackendClient, MemoryBackend, Subscription};
pub use config::{BackendConfig, ConfigError};
pub use error::{ApiError, BackendError};
pub use models::{ProfileInput, Session, User, UserProfile};
pub use profile::ProfileApi;
pub use theme::ThemeContext;

pub use store::{ResolvedTheme, Theme};
