use crate::domain::storage::KeyValueStore;
use anyhow::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, trace};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    #[instrument(level = "trace", skip(self))]
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let storage = self.storage.read();
        let value = storage.get(key).cloned();
        trace!(key = key, found = value.is_some(), "Read item from memory storage");
        Ok(value)
    }

    #[instrument(level = "trace", skip(self, value), fields(bytes = value.len()))]
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut storage = self.storage.write();
        storage.insert(key.to_string(), value.to_string());
        trace!(key = key, "Wrote item to memory storage");
        Ok(())
    }

    #[instrument(level = "trace", skip(self))]
    fn remove_item(&self, key: &str) -> Result<()> {
        let mut storage = self.storage.write();
        let removed = storage.remove(key).is_some();
        trace!(key = key, removed = removed, "Removed item from memory storage");
        Ok(())
    }
}
