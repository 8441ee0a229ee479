//! Binding persistence.
//!
//! The pipeline consumes a [`BindingStore`] but does not own its lifecycle:
//! bindings are loaded once at spawn and written back whenever a rebind (or
//! a defaults fallback) happens. [`TomlBindingStore`] is the file-backed
//! implementation; [`MemoryBindingStore`] serves tests and hosts that
//! persist elsewhere.

use crate::bindings::{ButtonBindings, GamepadButton, KeyBindings, KeyCode};
use crate::intent::Intent;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

/// The two binding maps as a persistence unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredBindings {
    pub key_binds: KeyBindings,
    pub button_binds: ButtonBindings,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read bindings file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse bindings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize bindings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no usable config directory on this system")]
    NoConfigDir,
}

/// Durable storage for binding maps.
///
/// `load` returning `Ok(None)` means "nothing persisted yet" and triggers
/// the defaults fallback; it is not an error.
pub trait BindingStore: Send + Sync {
    fn load(&self) -> Result<Option<StoredBindings>, StoreError>;
    fn save(&self, bindings: &StoredBindings) -> Result<(), StoreError>;
}

// TOML tables cannot be keyed by integers or enum values, so the maps are
// flattened into arrays of entry tables on disk.
#[derive(Serialize, Deserialize)]
struct BindingsFile {
    #[serde(default)]
    key_binds: Vec<KeyBindEntry>,
    #[serde(default)]
    button_binds: Vec<ButtonBindEntry>,
}

#[derive(Serialize, Deserialize)]
struct KeyBindEntry {
    code: KeyCode,
    intent: Intent,
}

#[derive(Serialize, Deserialize)]
struct ButtonBindEntry {
    button: GamepadButton,
    intent: Intent,
}

impl From<&StoredBindings> for BindingsFile {
    fn from(bindings: &StoredBindings) -> Self {
        let mut key_binds: Vec<KeyBindEntry> = bindings
            .key_binds
            .iter()
            .map(|(&code, &intent)| KeyBindEntry { code, intent })
            .collect();
        // Stable file order keeps diffs between saves readable.
        key_binds.sort_by_key(|entry| entry.code);

        let mut button_binds: Vec<ButtonBindEntry> = bindings
            .button_binds
            .iter()
            .map(|(&button, &intent)| ButtonBindEntry { button, intent })
            .collect();
        button_binds.sort_by_key(|entry| entry.button.flag().bits());

        Self {
            key_binds,
            button_binds,
        }
    }
}

impl From<BindingsFile> for StoredBindings {
    fn from(file: BindingsFile) -> Self {
        Self {
            key_binds: file
                .key_binds
                .into_iter()
                .map(|entry| (entry.code, entry.intent))
                .collect(),
            button_binds: file
                .button_binds
                .into_iter()
                .map(|entry| (entry.button, entry.intent))
                .collect(),
        }
    }
}

/// File-backed store, TOML under the platform config directory.
pub struct TomlBindingStore {
    path: PathBuf,
}

impl TomlBindingStore {
    /// Store at `<config_dir>/intentflow/bindings.toml`.
    pub fn new() -> Result<Self, StoreError> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::at_path(dir.join("intentflow").join("bindings.toml")))
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl BindingStore for TomlBindingStore {
    fn load(&self) -> Result<Option<StoredBindings>, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no bindings file yet");
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)?;
        let file: BindingsFile = toml::from_str(&raw)?;
        info!(path = %self.path.display(), "loaded persisted bindings");
        Ok(Some(file.into()))
    }

    fn save(&self, bindings: &StoredBindings) -> Result<(), StoreError> {
        let file = BindingsFile::from(bindings);
        let raw = toml::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, raw)?;
        info!(path = %self.path.display(), "persisted bindings");
        Ok(())
    }
}

/// In-memory store, mainly for tests.
#[derive(Default)]
pub struct MemoryBindingStore {
    bindings: Mutex<Option<StoredBindings>>,
}

impl MemoryBindingStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_bindings(bindings: StoredBindings) -> Self {
        Self {
            bindings: Mutex::new(Some(bindings)),
        }
    }

    /// What was last saved, if anything.
    pub fn saved(&self) -> Option<StoredBindings> {
        self.bindings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl BindingStore for MemoryBindingStore {
    fn load(&self) -> Result<Option<StoredBindings>, StoreError> {
        Ok(self.saved())
    }

    fn save(&self, bindings: &StoredBindings) -> Result<(), StoreError> {
        *self.bindings.lock().unwrap_or_else(|e| e.into_inner()) = Some(bindings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{default_button_binds, default_key_binds};

    fn sample() -> StoredBindings {
        StoredBindings {
            key_binds: default_key_binds(),
            button_binds: default_button_binds(),
        }
    }

    #[test]
    fn toml_file_form_round_trips() {
        let original = sample();
        let raw = toml::to_string_pretty(&BindingsFile::from(&original)).unwrap();
        let reloaded: StoredBindings = toml::from_str::<BindingsFile>(&raw).unwrap().into();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn file_store_save_then_load() {
        let dir = std::env::temp_dir().join(format!(
            "intentflow-store-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let store = TomlBindingStore::at_path(dir.join("bindings.toml"));

        assert!(store.load().unwrap().is_none());

        let bindings = sample();
        store.save(&bindings).unwrap();
        assert_eq!(store.load().unwrap(), Some(bindings));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn garbage_file_is_a_parse_error() {
        let dir = std::env::temp_dir().join(format!(
            "intentflow-store-garbage-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bindings.toml");
        std::fs::write(&path, "key_binds = \"not a list\"").unwrap();

        let store = TomlBindingStore::at_path(path);
        assert!(matches!(store.load(), Err(StoreError::Parse(_))));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn memory_store_records_last_save() {
        let store = MemoryBindingStore::empty();
        assert!(store.load().unwrap().is_none());

        let bindings = sample();
        store.save(&bindings).unwrap();
        assert_eq!(store.saved(), Some(bindings));
    }
}
