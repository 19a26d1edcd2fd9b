//! Snapshot of the whole local replica.
//!
//! Snapshots are the bridge between the in-memory replica and durable storage.
//! Keys are kept in a `BTreeMap` so serialization is deterministic.

use crate::{Error, Record, Result, StoreKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Every stored sequence, keyed by store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Stored sequences
    pub entries: BTreeMap<StoreKey, Vec<Record>>,
}

impl Default for ReplicaSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace a stored sequence.
    pub fn insert(&mut self, key: StoreKey, records: Vec<Record>) {
        self.entries.insert(key, records);
    }

    /// Get a stored sequence.
    pub fn get(&self, key: &StoreKey) -> Option<&Vec<Record>> {
        self.entries.get(key)
    }

    /// Count records across all keys.
    pub fn record_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Check that this snapshot can be loaded.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported format version {} (expected {})",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}
