//! Persistence for the preference history.
//!
//! The backing store is a plain key-value byte store; the repository layers
//! the JSON codec and the default-on-failure load policy on top of it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::warn;

use crate::config::KnowledgeParams;
use crate::error::{StorageError, StorageResult};
use crate::knowledge::history::PreferenceHistory;

/// Key the history is persisted under.
pub const KEY_HISTORY: &str = "user_zoom_history";

/// Minimal key-value byte store the host supplies.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;
}

/// In-process store, the default for embedding and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// One file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Repository for the preference history: JSON array of floats under one key.
pub struct PreferenceRepository {
    store: Box<dyn KeyValueStore>,
}

impl PreferenceRepository {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Load the persisted history. Absent, unreadable, or malformed data all
    /// fall back to the neutral default; the caller never sees a failure.
    pub fn load_history(&self, params: &KnowledgeParams) -> PreferenceHistory {
        let bytes = match self.store.get(KEY_HISTORY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return PreferenceHistory::neutral(),
            Err(e) => {
                warn!(error = %e, "Failed to read preference history, using default");
                return PreferenceHistory::neutral();
            }
        };

        match serde_json::from_slice::<Vec<f64>>(&bytes) {
            Ok(values) => PreferenceHistory::from_values(&values, params),
            Err(e) => {
                warn!(error = %e, "Malformed preference history, using default");
                PreferenceHistory::neutral()
            }
        }
    }

    pub fn save_history(&self, history: &PreferenceHistory) -> StorageResult<()> {
        let bytes = serde_json::to_vec(&history.values())?;
        self.store.set(KEY_HISTORY, &bytes)
    }
}
