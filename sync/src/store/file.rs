//! Durable store persisted as a JSON replica snapshot.

use super::{LocalStore, MemoryStore};
use crate::error::{Result, SyncError};
use canopy_engine::{Record, ReplicaSnapshot, StoreKey};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Write-through store: reads are served from memory, every write rewrites
/// the snapshot file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path`, loading the existing snapshot if there is one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = if path.exists() {
            let json = fs::read_to_string(&path)?;
            MemoryStore::from_snapshot(ReplicaSnapshot::from_json(&json)?)
        } else {
            MemoryStore::new()
        };

        tracing::debug!(path = %path.display(), keys = inner.len(), "Opened replica file");

        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SyncError::Storage("replica write lock poisoned".into()))?;

        let json = self.inner.snapshot().to_json()?;
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalStore for JsonFileStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<Record>>> {
        self.inner.get(key)
    }

    fn set(&self, key: &StoreKey, records: Vec<Record>) -> Result<()> {
        self.inner.set(key, records)?;
        self.flush()
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        self.inner.remove(key)?;
        self.flush()
    }

    fn keys(&self) -> Result<Vec<StoreKey>> {
        self.inner.keys()
    }
}
