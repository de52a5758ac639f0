//! Shared preference store constructor for all platforms.
//!
//! Returns a [`store::PreferenceStore`] for the current target:
//! - **Web** (WASM + `web` feature): browser `localStorage` via [`store::LocalStorageStore`]
//! - **Desktop / Mobile** (native): `preferences.toml` via [`store::FileStore`]
//! - **WASM without `web`**: [`store::MemoryStore`], nothing survives a reload

use std::sync::Arc;

use store::PreferenceStore;

/// Store handle shared by the session persistence and the theme context.
pub type SharedStore = Arc<dyn PreferenceStore + Send + Sync>;

/// Create the platform-appropriate preference store.
///
/// On native builds the file lives in `<data_dir>/lernpfad/`.
pub fn make_preference_store() -> SharedStore {
    #[cfg(all(target_arch = "wasm32", feature = "web"))]
    {
        Arc::new(store::LocalStorageStore)
    }
    #[cfg(all(target_arch = "wasm32", not(feature = "web")))]
    {
        tracing::warn!("No persistent preference storage on this target");
        Arc::new(store::MemoryStore::new())
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let base = dirs::data_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join("lernpfad");
        Arc::new(store::FileStore::new(base))
    }
}
