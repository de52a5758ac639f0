pub mod prefs;
pub mod theme;

mod memory;
pub use memory::MemoryStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store;
#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
mod local_storage;
#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub use local_storage::LocalStorageStore;

pub use prefs::{PreferenceStore, SESSION_KEY, THEME_KEY};
pub use theme::{ResolvedTheme, Theme, ThemeParseError};
