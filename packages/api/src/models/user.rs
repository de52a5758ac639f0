//! # Authenticated user
//!
//! [`User`] is the identity record the auth API returns from `/user`, from
//! sign-up and inside every [`crate::models::Session`]. The client never
//! writes it, only reads it. Apart from `id`, every field is optional or
//! defaulted because the backend omits or nulls fields depending on the sign-in
//! method (phone users have no email, OAuth users get provider metadata, and so
//! on).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity record as returned by the auth API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub app_metadata: serde_json::Value,
}

impl User {
    /// Whether the email address has been confirmed.
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }

    /// Get display name: `full_name` from the sign-up metadata, else the email.
    pub fn display_name(&self) -> &str {
        self.user_metadata
            .get("full_name")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_user() {
        let user: User = serde_json::from_str(
            r#"{"id":"0b7c3c55-3f6c-4c44-9a43-5f7b0c1f2b11","email":"anna@example.org","aud":"authenticated"}"#,
        )
        .unwrap();

        assert_eq!(user.email.as_deref(), Some("anna@example.org"));
        assert!(!user.is_email_confirmed());
        assert!(user.user_metadata.is_null());
        assert_eq!(user.display_name(), "anna@example.org");
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        let user: User = serde_json::from_str(
            r#"{
                "id":"0b7c3c55-3f6c-4c44-9a43-5f7b0c1f2b11",
                "email":"anna@example.org",
                "email_confirmed_at":"2024-03-01T10:00:00Z",
                "user_metadata":{"full_name":"Anna Schmidt"}
            }"#,
        )
        .unwrap();

        assert!(user.is_email_confirmed());
        assert_eq!(user.display_name(), "Anna Schmidt");
    }
}
