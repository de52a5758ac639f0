//! German user-facing messages for known sign-up failures.
//!
//! The backend reports errors in English. A handful of sign-up failures are
//! common enough that the registration form shows a translated message
//! instead. Matching is a case-insensitive substring test on the backend
//! message. Anything not listed passes through unchanged.

use crate::error::ApiError;

const SIGN_UP_TRANSLATIONS: &[(&[&str], &str)] = &[
    (
        &["already registered", "already exists"],
        "Diese E-Mail-Adresse ist bereits registriert. Bitte melden Sie sich an oder verwenden Sie eine andere E-Mail-Adresse.",
    ),
    (
        &["rate limit", "too many requests"],
        "Zu viele Versuche. Bitte warten Sie einen Moment und versuchen Sie es dann erneut.",
    ),
    (
        &["password should be at least"],
        "Das Passwort ist zu kurz. Es muss mindestens 6 Zeichen lang sein.",
    ),
    (
        &["invalid email", "validate email address", "email address is invalid"],
        "Bitte geben Sie eine gültige E-Mail-Adresse ein.",
    ),
    (
        &["signups not allowed", "signup is disabled"],
        "Registrierungen sind derzeit deaktiviert.",
    ),
];

/// Translation for a backend sign-up message, if one is known.
pub fn translate_sign_up_message(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    SIGN_UP_TRANSLATIONS
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lower.contains(needle)))
        .map(|(_, translated)| *translated)
}

/// Rewrite the message of a backend-reported sign-up error.
pub(crate) fn localize_sign_up_error(error: ApiError) -> ApiError {
    match error {
        ApiError::Backend {
            status,
            code,
            message,
        } => {
            let message = translate_sign_up_message(&message)
                .map(str::to_string)
                .unwrap_or(message);
            ApiError::Backend {
                status,
                code,
                message,
            }
        }
        other => other,
    }
}
