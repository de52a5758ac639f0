//! Backend connection configuration from environment variables.

use thiserror::Error;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project URL without trailing slash, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Public anon key, sent as `apikey` on every request.
    pub anon_key: String,
    /// Origin of this app, used for OAuth and password-reset redirects.
    pub site_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            site_url: None,
        }
    }

    pub fn with_site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = Some(site_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Create config from environment variables.
    ///
    /// Reads `LERNPFAD_BACKEND_URL` / `LERNPFAD_BACKEND_ANON_KEY` (or the
    /// `SUPABASE_URL` / `SUPABASE_ANON_KEY` fallbacks) and the optional
    /// `LERNPFAD_SITE_URL`. WASM builds have no process environment, so values
    /// baked in at compile time are used last.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let url = lookup(
            &["LERNPFAD_BACKEND_URL", "SUPABASE_URL"],
            option_env!("LERNPFAD_BACKEND_URL"),
        )
        .ok_or(ConfigError::Missing("LERNPFAD_BACKEND_URL"))?;
        let anon_key = lookup(
            &["LERNPFAD_BACKEND_ANON_KEY", "SUPABASE_ANON_KEY"],
            option_env!("LERNPFAD_BACKEND_ANON_KEY"),
        )
        .ok_or(ConfigError::Missing("LERNPFAD_BACKEND_ANON_KEY"))?;

        let config = Self::new(url, anon_key);
        Ok(match lookup(&["LERNPFAD_SITE_URL"], option_env!("LERNPFAD_SITE_URL")) {
            Some(site) => config.with_site_url(site),
            None => config,
        })
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.url)
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }

    /// Where the OAuth provider sends the browser back to.
    pub fn oauth_redirect(&self) -> Option<String> {
        self.site_url.as_ref().map(|s| format!("{s}/auth/callback"))
    }

    /// Target of the link in password-reset mails.
    pub fn password_reset_redirect(&self) -> Option<String> {
        self.site_url.as_ref().map(|s| format!("{s}/reset-password"))
    }
}

fn lookup(keys: &[&str], baked: Option<&'static str>) -> Option<String> {
    keys.iter()
        .find_map(|key| std::env::var(key).ok())
        .or_else(|| baked.map(str::to_string))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
