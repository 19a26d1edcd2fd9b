//! In-memory store.

use super::LocalStore;
use crate::error::Result;
use canopy_engine::{Record, ReplicaSnapshot, StoreKey};
use dashmap::DashMap;

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<StoreKey, Vec<Record>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Create a store pre-filled from a snapshot.
    pub fn from_snapshot(snapshot: ReplicaSnapshot) -> Self {
        let store = Self::new();
        for (key, records) in snapshot.entries {
            store.entries.insert(key, records);
        }
        store
    }

    /// Capture the current contents.
    pub fn snapshot(&self) -> ReplicaSnapshot {
        let mut snapshot = ReplicaSnapshot::new();
        for entry in self.entries.iter() {
            snapshot.insert(entry.key().clone(), entry.value().clone());
        }
        snapshot
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<Record>>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &StoreKey, records: Vec<Record>) -> Result<()> {
        self.entries.insert(key.clone(), records);
        Ok(())
    }

    fn remove(&self, key: &StoreKey) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<StoreKey>> {
        let mut keys: Vec<StoreKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
