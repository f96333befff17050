//! Whole-list persistence on top of a [`KeyValueStore`].
//!
//! Each collection lives under one key as a JSON array. Reads return the full
//! list and writes replace it, there is no per-record patching.

use crate::domain::error::DomainError;
use crate::domain::storage::KeyValueStore;
use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

/// Loads the list stored under `key`. A missing key is an empty list.
pub fn load_list<T, S>(store: &S, key: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let raw = store
        .get_item(key)
        .map_err(|e| DomainError::StorageRead(format!("{}: {}", key, e)))?;
    let Some(raw) = raw else {
        trace!(key = key, "No list stored yet");
        return Ok(Vec::new());
    };
    let items: Vec<T> = serde_json::from_str(&raw)
        .map_err(|e| DomainError::StorageRead(format!("{}: {}", key, e)))?;
    debug!(key = key, count = items.len(), "Loaded list from storage");
    Ok(items)
}

/// Replaces the list stored under `key`.
pub fn persist_list<T, S>(store: &S, key: &str, items: &[T]) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(items)
        .map_err(|e| DomainError::StorageWrite(format!("{}: {}", key, e)))?;
    store
        .set_item(key, &raw)
        .map_err(|e| DomainError::StorageWrite(format!("{}: {}", key, e)))?;
    debug!(key = key, count = items.len(), "Persisted list to storage");
    Ok(())
}
