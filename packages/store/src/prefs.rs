//! # Local preference storage
//!
//! [`PreferenceStore`] is the synchronous key/value interface behind the app's
//! "local storage". The browser's `localStorage` is synchronous, so the trait
//! is too, and every implementation is cheap to call from UI event handlers.
//!
//! | Implementation | Platform | Backing |
//! |----------------|----------|---------|
//! | [`crate::MemoryStore`] | all | `HashMap` behind a mutex (tests, fallback) |
//! | `FileStore` | native | a single TOML file under the platform data dir |
//! | `LocalStorageStore` | WASM + `web` | `window.localStorage` |
//!
//! A read that fails is a missing value. A write that fails is logged and
//! dropped. The authoritative copy of everything stored here lives in the
//! backend.

/// Key holding the theme preference (`light`, `dark` or `system`).
pub const THEME_KEY: &str = "lernpfad-theme";

/// Key holding the JSON-serialised auth session.
pub const SESSION_KEY: &str = "lernpfad-auth-token";

/// Synchronous string key/value store.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) {
        (**self).remove(key)
    }
}
