use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::prefs::PreferenceStore;

/// In-memory PreferenceStore for testing and as a fallback when no platform
/// storage is available.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::THEME_KEY;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get(THEME_KEY).is_none());

        store.set(THEME_KEY, "dark");
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));

        store.set(THEME_KEY, "light");
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("light"));

        store.remove(THEME_KEY);
        assert!(store.get(THEME_KEY).is_none());
    }

    #[test]
    fn test_clones_share_values() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.set("k", "v");
        assert_eq!(other.get("k").as_deref(), Some("v"));
    }
}
