//! Per-page reading positions, persisted as one URL -> chunk index map.

use crate::page::normalize_page_url;
use crate::storage::KeyValueStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub const POSITIONS_KEY: &str = "reading-positions";

#[derive(Clone)]
pub struct ReadingPositions {
    store: Arc<dyn KeyValueStore>,
}

impl ReadingPositions {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, url: &str) -> Option<usize> {
        let key = normalize_page_url(url);
        self.entries()
            .get(&key)
            .and_then(Value::as_u64)
            .and_then(|index| usize::try_from(index).ok())
    }

    /// Persist `index` for `url`. Storage errors are logged and ignored so
    /// playback never stalls on them.
    pub fn save(&self, url: &str, index: usize) {
        let key = normalize_page_url(url);
        let mut entries = self.entries();
        entries.insert(key.clone(), Value::from(index));
        self.write(entries);
        debug!(url = %key, index, "Saved reading position");
    }

    pub fn clear(&self, url: &str) {
        let key = normalize_page_url(url);
        let mut entries = self.entries();
        if entries.remove(&key).is_some() {
            self.write(entries);
            debug!(url = %key, "Cleared reading position");
        }
    }

    fn entries(&self) -> Map<String, Value> {
        match self.store.get(POSITIONS_KEY) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    fn write(&self, entries: Map<String, Value>) {
        if let Err(err) = self.store.set(POSITIONS_KEY, Value::Object(entries)) {
            warn!("Failed to persist reading positions: {err}");
        }
    }
}

/// Where a new session starts: the saved index when it still fits.
pub fn resume_index(saved: Option<usize>, chunk_count: usize) -> usize {
    match saved {
        Some(index) if index < chunk_count => index,
        _ => 0,
    }
}
