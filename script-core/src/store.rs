//! Persistent key-value stores

use crate::error::ScriptError;
use crate::host::PersistentStore;
use crate::Result;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// In-memory store, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PersistentStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// The file is re-read on every access so separate invocations (and
/// separate processes run one after another) see each other's writes.
/// Writes go to a sibling temp file which is then renamed over the target.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(ScriptError::Store(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }
}

impl PersistentStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let map = self.load()?;
        Ok(match map.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ScriptError::Store("store lock poisoned".to_string()))?;

        let mut map = self.load()?;
        map.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(&Value::Object(map))?)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!(key, path = %self.path.display(), "Store entry written");
        Ok(())
    }
}

/// Read `key`, writing `default` back first when it is absent.
pub fn load_or_initialize(store: &dyn PersistentStore, key: &str, default: &str) -> Result<String> {
    match store.read(key)? {
        Some(value) => Ok(value),
        None => {
            info!(key, "Initialising store entry with default value");
            store.write(key, default)?;
            Ok(default.to_string())
        }
    }
}

/// Split a semicolon-delimited list, dropping empty segments
pub fn parse_delimited(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
