//! # Browser `localStorage` preference store
//!
//! [`LocalStorageStore`] is the [`PreferenceStore`] used on the web platform.
//! It is a zero-size handle that looks up `window.localStorage` on every call.
//! `web_sys::Storage` is not `Send`, so holding one would make the store
//! unusable behind `Arc<dyn PreferenceStore + Send + Sync>`.
//!
//! Storage can be missing (private browsing, sandboxed iframes) or full. Reads
//! then return `None` and writes are logged and dropped.

use crate::prefs::PreferenceStore;

#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    pub fn new() -> Self {
        Self
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl PreferenceStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        let Some(storage) = Self::storage() else {
            tracing::warn!("localStorage unavailable, dropping {}", key);
            return;
        };
        if storage.set_item(key, value).is_err() {
            tracing::warn!("localStorage rejected write of {}", key);
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}
