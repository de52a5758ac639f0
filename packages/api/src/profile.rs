//! # Profile API wrapper
//!
//! [`ProfileApi`] is CRUD over the `user_profiles` table for the signed-in
//! user. Every operation first asks the auth backend who is signed in and
//! fails with [`ApiError::NotAuthenticated`] before touching the table if
//! nobody is. Writes take the nested [`ProfileInput`] the settings forms
//! produce and send the complete flat row built by
//! [`ProfileInput::into_row`].

use store::Theme;

use crate::backend::{AuthBackend, ProfileTable};
use crate::error::{surface, ApiError};
use crate::models::{ProfileInput, User, UserProfile};

#[derive(Clone)]
pub struct ProfileApi<B> {
    backend: B,
}

impl<B: AuthBackend + ProfileTable> ProfileApi<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.backend
            .get_user()
            .await
            .map_err(|e| surface("get_user", e))?
            .ok_or(ApiError::NotAuthenticated)
    }

    /// The signed-in user's row, `None` if it was never created.
    pub async fn get_profile(&self) -> Result<Option<UserProfile>, ApiError> {
        let user = self.current_user().await?;
        tracing::debug!("get_profile {}", user.id);
        self.backend
            .select_profile(user.id)
            .await
            .map_err(|e| surface("select user_profiles", e))
    }

    pub async fn create_profile(&self, input: ProfileInput) -> Result<UserProfile, ApiError> {
        let user = self.current_user().await?;
        let row = input.into_row(user.id, user.email)?;
        tracing::debug!("create_profile {}", row.id);
        self.backend
            .insert_profile(&row)
            .await
            .map_err(|e| surface("insert user_profiles", e))
    }

    /// Overwrite the existing row. Fields missing from `input` are reset to
    /// their defaults.
    pub async fn update_profile(&self, input: ProfileInput) -> Result<UserProfile, ApiError> {
        let user = self.current_user().await?;
        let row = input.into_row(user.id, user.email)?;
        tracing::debug!("update_profile {}", row.id);
        self.backend
            .update_profile(&row)
            .await
            .map_err(|e| surface("update user_profiles", e))
    }

    pub async fn upsert_profile(&self, input: ProfileInput) -> Result<UserProfile, ApiError> {
        let user = self.current_user().await?;
        let row = input.into_row(user.id, user.email)?;
        tracing::debug!("upsert_profile {}", row.id);
        self.backend
            .upsert_profile(&row)
            .await
            .map_err(|e| surface("upsert user_profiles", e))
    }

    pub async fn delete_profile(&self) -> Result<(), ApiError> {
        let user = self.current_user().await?;
        tracing::debug!("delete_profile {}", user.id);
        self.backend
            .delete_profile(user.id)
            .await
            .map_err(|e| surface("delete user_profiles", e))
    }

    /// Set only the `theme` column. Other columns keep their stored values,
    /// or get defaults when no row exists yet.
    pub async fn update_theme(&self, theme: &str) -> Result<UserProfile, ApiError> {
        let theme: Theme = theme
            .parse()
            .map_err(|_| ApiError::InvalidTheme(theme.to_string()))?;
        let user = self.current_user().await?;

        let existing = self
            .backend
            .select_profile(user.id)
            .await
            .map_err(|e| surface("select user_profiles", e))?;
        let row = match existing {
            Some(row) => UserProfile { theme, ..row },
            None => UserProfile {
                theme,
                ..ProfileInput::default().into_row(user.id, user.email)?
            },
        };

        tracing::debug!("update_theme {} -> {}", row.id, theme);
        self.backend
            .upsert_profile(&row)
            .await
            .map_err(|e| surface("upsert user_profiles", e))
    }
}
