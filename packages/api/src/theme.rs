//! # Theme context
//!
//! Holds the light/dark/system preference. The local copy in the
//! [`PreferenceStore`] (key [`THEME_KEY`]) is authoritative for rendering.
//! For a signed-in user the profile row's `theme` column is updated as
//! well, and a failed remote write never rolls the local change back.

use store::{PreferenceStore, ResolvedTheme, Theme, THEME_KEY};

use crate::backend::{AuthBackend, ProfileTable};
use crate::error::ApiError;
use crate::models::UserProfile;
use crate::profile::ProfileApi;

pub struct ThemeContext<S> {
    storage: S,
    preference: Theme,
}

impl<S: PreferenceStore> ThemeContext<S> {
    /// Read the stored preference. Missing or unknown values mean `system`.
    pub fn load(storage: S) -> Self {
        let preference = match storage.get(THEME_KEY) {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Ignoring stored theme: {}", e);
                Theme::default()
            }),
            None => Theme::default(),
        };
        Self {
            storage,
            preference,
        }
    }

    pub fn preference(&self) -> Theme {
        self.preference
    }

    pub fn resolve(&self, system_prefers_dark: bool) -> ResolvedTheme {
        self.preference.resolve(system_prefers_dark)
    }

    /// Parse and store `value` locally. Unknown values leave everything as
    /// it was.
    pub fn set_preference(&mut self, value: &str) -> Result<Theme, ApiError> {
        let theme: Theme = value.parse().map_err(|_| {
            tracing::warn!("Rejected theme {:?}", value);
            ApiError::InvalidTheme(value.to_string())
        })?;
        self.apply(theme);
        Ok(theme)
    }

    /// Adopt the theme stored in the user's profile.
    pub fn hydrate_from_profile(&mut self, profile: &UserProfile) {
        if profile.theme != self.preference {
            tracing::debug!("Theme from profile: {}", profile.theme);
            self.apply(profile.theme);
        }
    }

    /// [`set_preference`](Self::set_preference), then push the result to the
    /// profile row.
    pub async fn set_theme<B: AuthBackend + ProfileTable>(
        &mut self,
        value: &str,
        profiles: &ProfileApi<B>,
    ) -> Result<Theme, ApiError> {
        let theme = self.set_preference(value)?;
        sync_theme_to_profile(theme, profiles).await;
        Ok(theme)
    }

    fn apply(&mut self, theme: Theme) {
        self.preference = theme;
        self.storage.set(THEME_KEY, theme.as_str());
    }
}

/// Write `theme` to the profile row. Failures are logged only; signed-out
/// users are skipped.
pub async fn sync_theme_to_profile<B: AuthBackend + ProfileTable>(
    theme: Theme,
    profiles: &ProfileApi<B>,
) {
    match profiles.update_theme(theme.as_str()).await {
        Ok(_) => tracing::debug!("Theme {} saved to profile", theme),
        Err(ApiError::NotAuthenticated) => {
            tracing::debug!("Theme {} kept local, nobody signed in", theme)
        }
        Err(e) => tracing::warn!("Saving theme to profile failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use crate::error::BackendError;
    use crate::models::ProfileInput;
    use store::MemoryStore;
    use uuid::Uuid;

    #[test]
    fn test_load_defaults_to_system() {
        let storage = MemoryStore::new();
        assert_eq!(ThemeContext::load(storage.clone()).preference(), Theme::System);

        storage.set(THEME_KEY, "purple");
        assert_eq!(ThemeContext::load(storage.clone()).preference(), Theme::System);

        storage.set(THEME_KEY, "dark");
        assert_eq!(ThemeContext::load(storage).preference(), Theme::Dark);
    }

    #[test]
    fn test_invalid_value_leaves_state_unchanged() {
        let storage = MemoryStore::new();
        let mut ctx = ThemeContext::load(storage.clone());
        ctx.set_preference("light").unwrap();

        let err = ctx.set_preference("sepia").unwrap_err();

        assert_eq!(err, ApiError::InvalidTheme("sepia".into()));
        assert_eq!(ctx.preference(), Theme::Light);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn test_set_preference_persists_and_resolves() {
        let storage = MemoryStore::new();
        let mut ctx = ThemeContext::load(storage.clone());

        assert_eq!(ctx.set_preference("system"), Ok(Theme::System));
        assert_eq!(ctx.resolve(true), ResolvedTheme::Dark);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("system"));

        ctx.set_preference("light").unwrap();
        assert_eq!(ctx.resolve(true), ResolvedTheme::Light);
        assert_eq!(ThemeContext::load(storage).preference(), Theme::Light);
    }

    #[test]
    fn test_hydrate_from_profile() {
        let storage = MemoryStore::new();
        let mut ctx = ThemeContext::load(storage.clone());
        let mut profile = ProfileInput::default()
            .into_row(Uuid::new_v4(), None)
            .unwrap();
        profile.theme = Theme::Dark;

        ctx.hydrate_from_profile(&profile);

        assert_eq!(ctx.preference(), Theme::Dark);
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn test_set_theme_signed_out_stays_local() {
        let backend = MemoryBackend::new();
        let profiles = ProfileApi::new(backend.clone());
        let mut ctx = ThemeContext::load(MemoryStore::new());

        assert_eq!(ctx.set_theme("dark", &profiles).await, Ok(Theme::Dark));
        assert_eq!(ctx.preference(), Theme::Dark);
        assert_eq!(backend.call_count(BackendCall::UpsertProfile), 0);
    }

    #[tokio::test]
    async fn test_set_theme_signed_in_updates_profile() {
        let backend = MemoryBackend::new();
        let user = backend.add_user("anna@example.org", "geheim123", true);
        backend
            .sign_in_with_password("anna@example.org", "geheim123")
            .await
            .unwrap();
        let profiles = ProfileApi::new(backend.clone());
        let mut ctx = ThemeContext::load(MemoryStore::new());

        ctx.set_theme("light", &profiles).await.unwrap();

        assert_eq!(backend.profile(user.id).unwrap().theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_local_change() {
        let backend = MemoryBackend::new();
        backend.add_user("anna@example.org", "geheim123", true);
        backend
            .sign_in_with_password("anna@example.org", "geheim123")
            .await
            .unwrap();
        backend.fail_next(BackendError::api(503, "Service unavailable"));
        let profiles = ProfileApi::new(backend.clone());
        let storage = MemoryStore::new();
        let mut ctx = ThemeContext::load(storage.clone());

        assert_eq!(ctx.set_theme("dark", &profiles).await, Ok(Theme::Dark));
        assert_eq!(storage.get(THEME_KEY).as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn test_invalid_theme_never_reaches_backend() {
        let backend = MemoryBackend::new();
        let profiles = ProfileApi::new(backend.clone());
        let mut ctx = ThemeContext::load(MemoryStore::new());

        assert!(ctx.set_theme("blue", &profiles).await.is_err());
        assert!(backend.calls().is_empty());
    }
}
