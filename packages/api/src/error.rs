//! # Error types
//!
//! Two layers, mirroring the two layers of the crate:
//!
//! - [`BackendError`] is what the HTTP clients in [`crate::backend`] produce.
//!   It keeps the transport cause (`reqwest`, `serde_json`) for logging.
//! - [`ApiError`] is what the façades ([`crate::auth::AuthService`],
//!   [`crate::profile::ProfileApi`], [`crate::theme::ThemeContext`]) hand to UI
//!   code. It is `Clone + PartialEq` so it can live in a Dioxus signal, and its
//!   `Display` is the user-facing message.
//!
//! Converting a transport or decode failure into an [`ApiError`] logs the cause
//! and replaces it with [`GENERIC_ERROR_MESSAGE`].

use thiserror::Error;

/// Fallback shown when something failed that the backend did not describe.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Ein unerwarteter Fehler ist aufgetreten. Bitte versuchen Sie es später erneut.";

/// Errors raised while talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with an error body.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The client configuration cannot produce a usable request.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The call needs an access token and none is held.
    #[error("Auth session missing")]
    MissingSession,
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        BackendError::Api {
            status,
            code: None,
            message: message.into(),
        }
    }
}

/// Errors returned by the façades.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Reported by the backend, possibly rewritten into a localized message.
    #[error("{message}")]
    Backend {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    #[error("No authenticated user")]
    NotAuthenticated,
    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),
    #[error("Invalid theme preference: {0}")]
    InvalidTheme(String),
    #[error("{0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn unexpected() -> Self {
        ApiError::Unexpected(GENERIC_ERROR_MESSAGE.to_string())
    }

    /// The message to show to the user.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<BackendError> for ApiError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Api {
                status,
                code,
                message,
            } => ApiError::Backend {
                status: Some(status),
                code,
                message,
            },
            BackendError::MissingSession => ApiError::NotAuthenticated,
            other => {
                tracing::error!("Backend call failed: {}", other);
                ApiError::unexpected()
            }
        }
    }
}

/// Convert a backend failure for `operation`, logging backend-reported ones.
pub(crate) fn surface(operation: &str, error: BackendError) -> ApiError {
    let error = ApiError::from(error);
    if let ApiError::Backend { .. } = &error {
        tracing::warn!("{} failed: {}", operation, error);
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_backend_message() {
        let err: ApiError = BackendError::Api {
            status: 400,
            code: Some("invalid_credentials".into()),
            message: "Invalid login credentials".into(),
        }
        .into();

        assert_eq!(err.message(), "Invalid login credentials");
        assert!(matches!(err, ApiError::Backend { status: Some(400), .. }));
    }

    #[test]
    fn test_decode_failure_becomes_generic_message() {
        let decode = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ApiError = BackendError::from(decode).into();

        assert_eq!(err, ApiError::unexpected());
        assert_eq!(err.message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_config_failure_becomes_generic_message() {
        let err: ApiError = BackendError::Config("relative URL without a base".into()).into();
        assert_eq!(err, ApiError::unexpected());
    }

    #[test]
    fn test_missing_session_is_not_authenticated() {
        let err: ApiError = BackendError::MissingSession.into();
        assert_eq!(err, ApiError::NotAuthenticated);
        assert_eq!(err.message(), "No authenticated user");
    }
}
