//! # Profile model for the `user_profiles` table
//!
//! Two representations of a profile:
//!
//! ## [`UserProfile`]
//!
//! The flat row exactly as the table stores it, keyed by the auth user id.
//! Personal fields, notification flags, the theme preference and two JSON
//! blobs (`social_links`, `settings`) sit side by side.
//!
//! ## [`ProfileInput`]
//!
//! The nested, loosely typed object the settings forms build. Every field is
//! optional. [`ProfileInput::into_row`] flattens it into a complete
//! [`UserProfile`] and fills defaults for everything left unset, so every
//! write sends a fully formed record. The theme is the only field checked on
//! the client.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use store::Theme;
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_LANGUAGE: &str = "de";
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
pub const DEFAULT_EXPERIENCE_LEVEL: &str = "beginner";
pub const DEFAULT_DAILY_GOAL_MINUTES: i32 = 30;

/// A row of the `user_profiles` table.
///
/// Decoding goes through a nullable row shape, so NULL or missing columns read as
/// their defaults instead of failing the whole row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "ProfileRow")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub language: String,
    pub timezone: String,
    pub theme: Theme,
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub course_updates: bool,
    pub marketing_emails: bool,
    pub weekly_digest: bool,
    pub learning_goal: Option<String>,
    pub experience_level: String,
    pub daily_goal_minutes: i32,
    pub social_links: serde_json::Value,
    pub settings: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A row as the table may hand it out: every column but `id` nullable.
#[derive(Debug, Deserialize)]
struct ProfileRow {
    id: Uuid,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    display_name: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    location: Option<String>,
    website: Option<String>,
    language: Option<String>,
    timezone: Option<String>,
    theme: Option<String>,
    email_notifications: Option<bool>,
    push_notifications: Option<bool>,
    course_updates: Option<bool>,
    marketing_emails: Option<bool>,
    weekly_digest: Option<bool>,
    learning_goal: Option<String>,
    experience_level: Option<String>,
    daily_goal_minutes: Option<i32>,
    social_links: Option<serde_json::Value>,
    settings: Option<serde_json::Value>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        let theme = match row.theme.as_deref() {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Profile {} has {}, using system", row.id, e);
                Theme::default()
            }),
            None => Theme::default(),
        };
        UserProfile {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            bio: row.bio,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            location: row.location,
            website: row.website,
            language: row
                .language
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            timezone: row
                .timezone
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            theme,
            email_notifications: row.email_notifications.unwrap_or(true),
            push_notifications: row.push_notifications.unwrap_or(false),
            course_updates: row.course_updates.unwrap_or(true),
            marketing_emails: row.marketing_emails.unwrap_or(false),
            weekly_digest: row.weekly_digest.unwrap_or(true),
            learning_goal: row.learning_goal,
            experience_level: row
                .experience_level
                .unwrap_or_else(|| DEFAULT_EXPERIENCE_LEVEL.to_string()),
            daily_goal_minutes: row
                .daily_goal_minutes
                .unwrap_or(DEFAULT_DAILY_GOAL_MINUTES),
            social_links: non_null_object(row.social_links),
            settings: non_null_object(row.settings),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn non_null_object(value: Option<serde_json::Value>) -> serde_json::Value {
    match value {
        Some(serde_json::Value::Null) | None => serde_json::json!({}),
        Some(value) => value,
    }
}

impl UserProfile {
    /// Get "first last", falling back to the display name.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            self.display_name.clone()
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Nested profile input as produced by the settings forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub personal: PersonalInput,
    pub preferences: PreferenceInput,
    pub notifications: NotificationInput,
    pub learning: LearningInput,
    pub social_links: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub location: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceInput {
    pub language: Option<String>,
    pub timezone: Option<String>,
    /// Free text from the form; must be `light`, `dark` or `system`.
    pub theme: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationInput {
    pub email: Option<bool>,
    pub push: Option<bool>,
    pub course_updates: Option<bool>,
    pub marketing: Option<bool>,
    pub weekly_digest: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningInput {
    pub goal: Option<String>,
    pub experience_level: Option<String>,
    pub daily_goal_minutes: Option<i32>,
}

impl ProfileInput {
    /// Flatten into a complete row for `user_id`, filling defaults.
    pub fn into_row(self, user_id: Uuid, email: Option<String>) -> Result<UserProfile, ApiError> {
        let theme = match self.preferences.theme {
            Some(raw) => raw
                .parse::<Theme>()
                .map_err(|_| ApiError::InvalidTheme(raw))?,
            None => Theme::default(),
        };
        let personal = self.personal;
        let notifications = self.notifications;
        let learning = self.learning;

        Ok(ProfileRow {
            id: user_id,
            email,
            first_name: non_empty(personal.first_name),
            last_name: non_empty(personal.last_name),
            display_name: non_empty(personal.display_name),
            avatar_url: non_empty(personal.avatar_url),
            bio: non_empty(personal.bio),
            phone: non_empty(personal.phone),
            date_of_birth: personal.date_of_birth,
            location: non_empty(personal.location),
            website: non_empty(personal.website),
            language: non_empty(self.preferences.language),
            timezone: non_empty(self.preferences.timezone),
            theme: Some(theme.as_str().to_string()),
            email_notifications: notifications.email,
            push_notifications: notifications.push,
            course_updates: notifications.course_updates,
            marketing_emails: notifications.marketing,
            weekly_digest: notifications.weekly_digest,
            learning_goal: non_empty(learning.goal),
            experience_level: non_empty(learning.experience_level),
            daily_goal_minutes: learning.daily_goal_minutes,
            social_links: self.social_links,
            settings: self.settings,
            created_at: None,
            updated_at: None,
        }
        .into())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
