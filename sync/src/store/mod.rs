//! Local key-value storage for replicated record sequences.
//!
//! The puller and the CRUD surface share one [`LocalStore`]. Stores offer no
//! read-modify-write locking; callers that load, merge and write back can race
//! with each other on the same key.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::error::Result;
use canopy_engine::{Record, StoreKey};

/// Keyed storage of ordered record sequences.
pub trait LocalStore: Send + Sync {
    /// Load the sequence stored under `key`, if any.
    fn get(&self, key: &StoreKey) -> Result<Option<Vec<Record>>>;

    /// Replace the sequence stored under `key`.
    fn set(&self, key: &StoreKey, records: Vec<Record>) -> Result<()>;

    /// Drop the sequence stored under `key`.
    fn remove(&self, key: &StoreKey) -> Result<()>;

    /// All keys currently stored.
    fn keys(&self) -> Result<Vec<StoreKey>>;
}
