//! # Filesystem-backed preference store
//!
//! [`FileStore`] is the [`PreferenceStore`] used on desktop and mobile builds.
//! All keys live in one TOML file so the preferences survive app restarts and
//! stay human-editable.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! └── preferences.toml     # "lernpfad-theme" = "dark"
//! ```
//!
//! Use `dirs::data_dir()` to obtain a platform-appropriate base:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS / iOS | `~/Library/Application Support/lernpfad/` |
//! | Linux | `~/.local/share/lernpfad/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\lernpfad\` |

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::prefs::PreferenceStore;

const FILENAME: &str = "preferences.toml";

/// Filesystem-backed PreferenceStore for desktop and mobile persistence.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
    // Serialises read-modify-write cycles between clones.
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(base: PathBuf) -> Self {
        Self {
            base,
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn path(&self) -> PathBuf {
        self.base.join(FILENAME)
    }

    fn load(&self) -> BTreeMap<String, String> {
        let Ok(content) = std::fs::read_to_string(self.path()) else {
            return BTreeMap::new();
        };
        toml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable {}: {}", FILENAME, e);
            BTreeMap::new()
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) {
        let content = match toml::to_string_pretty(values) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("Failed to serialise preferences: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::create_dir_all(&self.base) {
            tracing::warn!("Failed to create {}: {}", self.base.display(), e);
            return;
        }
        if let Err(e) = std::fs::write(self.path(), content) {
            tracing::warn!("Failed to write {}: {}", FILENAME, e);
        }
    }

    fn update(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut values = self.load();
        f(&mut values);
        self.save(&values);
    }
}

impl PreferenceStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
        });
    }

    fn remove(&self, key: &str) {
        self.update(|values| {
            values.remove(key);
        });
    }
}
