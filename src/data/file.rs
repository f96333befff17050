use crate::domain::storage::KeyValueStore;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, trace};

/// Key space persisted as one JSON object in a file.
///
/// Every call re-reads the file so several processes pointed at the same path
/// see each other's writes, much like tabs sharing browser storage. Writes go
/// through a temporary file and a rename.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories and an empty
    /// key space if the file does not exist yet.
    #[instrument]
    pub fn open(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let store = Self {
            path,
            lock: Mutex::new(()),
        };

        if store.path.exists() {
            // Fail early on a file that is not a key space.
            let entries = store.read_entries()?;
            info!(path = %store.path.display(), keys = entries.len(), "Opened file storage");
        } else {
            store.write_entries(&BTreeMap::new())?;
            info!(path = %store.path.display(), "Created file storage");
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        debug!(path = %self.path.display(), keys = entries.len(), "File storage flushed");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    #[instrument(level = "trace", skip(self))]
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        let value = entries.remove(key);
        trace!(key = key, found = value.is_some(), "Read item from file storage");
        Ok(value)
    }

    #[instrument(level = "trace", skip(self, value), fields(bytes = value.len()))]
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    #[instrument(level = "trace", skip(self))]
    fn remove_item(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
