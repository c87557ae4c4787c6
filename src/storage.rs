//! Persistent key-value storage with change notifications.
//!
//! Values are JSON. `FileStore` keeps everything in one JSON object on disk
//! and rewrites it on every `set`; `MemoryStore` is the same minus the file.
//! Watchers run after the lock is released, on the thread that called `set`.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, warn};

pub type WatchCallback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode stored values: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
    /// Register `callback` to run with the new value whenever `key` is set.
    fn watch(&self, key: &str, callback: WatchCallback);
}

#[derive(Default)]
struct StoreState {
    values: Map<String, Value>,
    watchers: Vec<(String, WatchCallback)>,
}

impl StoreState {
    fn callbacks_for(&self, key: &str) -> Vec<WatchCallback> {
        self.watchers
            .iter()
            .filter(|(watched, _)| watched == key)
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }
}

fn notify(callbacks: Vec<WatchCallback>, value: &Value) {
    for callback in callbacks {
        callback(value);
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let callbacks = {
            let mut state = self.lock();
            state.values.insert(key.to_string(), value.clone());
            state.callbacks_for(key)
        };
        notify(callbacks, &value);
        Ok(())
    }

    fn watch(&self, key: &str, callback: WatchCallback) {
        self.lock().watchers.push((key.to_string(), callback));
    }
}

pub struct FileStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<Map<String, Value>>(&data) {
                Ok(values) => {
                    debug!(path = %path.display(), keys = values.len(), "Loaded stored values");
                    values
                }
                Err(err) => {
                    warn!(path = %path.display(), "Ignoring corrupt storage file: {err}");
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self {
            path: path.to_path_buf(),
            state: Mutex::new(StoreState {
                values,
                watchers: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let contents = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, contents).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.lock().values.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let callbacks = {
            let mut state = self.lock();
            let mut candidate = state.values.clone();
            candidate.insert(key.to_string(), value.clone());
            self.persist(&candidate)?;
            state.values = candidate;
            state.callbacks_for(key)
        };
        notify(callbacks, &value);
        Ok(())
    }

    fn watch(&self, key: &str, callback: WatchCallback) {
        self.lock().watchers.push((key.to_string(), callback));
    }
}
