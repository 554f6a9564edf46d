//! Extension-scoped persistent state
//!
//! A flat key/value store of JSON values. The file-backed store re-reads the file
//! on every access so separate invocations always see each other's writes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::mru::{MruEntry, MruList};

/// Key holding the design system MRU list
pub const MRU_KEY: &str = "designSystemIdList";

/// Get/set access to persisted values
pub trait StateStore {
    fn get(&self, key: &str) -> StateResult<Option<Value>>;

    fn set(&mut self, key: &str, value: Value) -> StateResult<()>;
}

/// Volatile store, used by tests and embedders that persist elsewhere
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> StateResult<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> StateResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON object stored in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's data directory
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("taxi-eds")
            .join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StateResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, values: &Map<String, Value>) -> StateResult<()> {
        let io_err = |source| StateError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(values).map_err(StateError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> StateResult<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: Value) -> StateResult<()> {
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }
}

/// Load the MRU list. A missing or non-list value yields an empty list and
/// malformed entries are skipped.
pub fn load_mru(store: &dyn StateStore) -> StateResult<MruList> {
    let entries = match store.get(MRU_KEY)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<MruEntry>(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping malformed {} entry: {}", MRU_KEY, e);
                    None
                }
            })
            .collect(),
        Some(other) => {
            warn!("ignoring non-list {} value: {}", MRU_KEY, other);
            Vec::new()
        }
        None => Vec::new(),
    };
    Ok(MruList::from_entries(entries))
}

/// Persist the MRU list
pub fn save_mru(store: &mut dyn StateStore, list: &MruList) -> StateResult<()> {
    let value = serde_json::to_value(list).map_err(StateError::Encode)?;
    debug!(entries = list.len(), "saving {}", MRU_KEY);
    store.set(MRU_KEY, value)
}
