//! Persisted client preferences.
//!
//! A small key-value store abstraction with a JSON-file backend, plus the
//! theme preference built on top of it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{RagchatError, Result};
use crate::types::Theme;

/// Key under which the theme preference is stored.
pub const THEME_KEY: &str = "theme";

/// String key-value storage for preferences.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store, nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|e| RagchatError::Prefs(format!("store lock poisoned: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// Store backed by a JSON object file, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file. Missing or corrupt files read as empty.
    fn read_all(&self) -> BTreeMap<String, String> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read preferences");
                return BTreeMap::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt preferences file");
                BTreeMap::new()
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.read_all();
        values.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), key, "Preference saved");
        Ok(())
    }
}

// =============================================================================
// ThemeStore
// =============================================================================

/// Theme preference: read at startup, written on every toggle.
pub struct ThemeStore<S: KeyValueStore> {
    store: S,
    current: Theme,
}

impl<S: KeyValueStore> ThemeStore<S> {
    /// Load the stored theme, defaulting to light.
    pub fn load(store: S) -> Self {
        let current = store
            .get(THEME_KEY)
            .and_then(|v| Theme::parse(&v))
            .unwrap_or_default();
        debug!(theme = current.as_str(), "Theme loaded");
        Self { store, current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Flip the theme and persist the new value.
    pub fn toggle(&mut self) -> Result<Theme> {
        let next = self.current.toggled();
        self.store.set(THEME_KEY, next.as_str())?;
        self.current = next;
        debug!(theme = next.as_str(), "Theme toggled");
        Ok(next)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
