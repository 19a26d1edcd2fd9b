//! # Canopy Engine
//!
//! Identity, keying and merge rules for an offline replica of a hierarchical
//! remote dataset.
//!
//! This crate holds the logic shared by the synchronization scheduler and the
//! local CRUD surface. It does not perform any IO: storage, transport and
//! timers live in `canopy-sync`.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never touches files, network or clocks
//! - **One key scheme**: sync and CRUD derive store keys the same way
//! - **One merge rule**: upsert by identity, last write wins
//!
//! ## Core Concepts
//!
//! ### Records and identity
//!
//! A [`Record`] is an open JSON object. Its primary [`Identity`] is the
//! server-assigned numeric `id` when present, otherwise the client-assigned
//! `guid`. [`classify`] decides which field a raw lookup value addresses.
//!
//! ### Store keys
//!
//! A [`StoreKey`] combines the tenant (builder) scope, the resource path and
//! the non-system request [`Params`]. Full and incremental fetches of the same
//! resource share a key.
//!
//! ### Merging
//!
//! [`merge::upsert_one`] applies a local edit; [`merge::upsert_many`] folds an
//! incremental fetch into stored data. A full fetch replaces stored data.
//!
//! ### Resource trees and queues
//!
//! A [`ResourceNode`] describes what to fetch and how parent fields become
//! child request parameters. A [`QueueConfig`] groups trees under one sync
//! interval and [`SchedulerState`] decides when each queue may run.
//!
//! ## Quick Start
//!
//! ```rust
//! use canopy_engine::{merge, Params, Record, StoreKey};
//! use serde_json::json;
//!
//! let key = StoreKey::for_request("projects", &Params::new().with("builder_id", 7));
//! assert_eq!(key.as_str(), "7_/projects");
//!
//! let stored: Vec<Record> = serde_json::from_value(json!([{"id": 1, "a": "x"}])).unwrap();
//! let fetched: Vec<Record> = serde_json::from_value(json!([{"id": 1, "a": "y"}])).unwrap();
//!
//! let merged = merge::upsert_many(stored, fetched);
//! assert_eq!(merged[0].get("a"), Some(&json!("y")));
//! ```

pub mod audit;
pub mod error;
pub mod identity;
pub mod key;
pub mod merge;
pub mod queue;
pub mod record;
pub mod snapshot;
pub mod time;
pub mod tree;

// Re-export main types at crate root
pub use audit::{AuditLog, AuditLogEntry, AuditMethod};
pub use error::Error;
pub use identity::{classify, Identity, IdentityKind};
pub use key::{Params, StoreKey, MODIFIED_SINCE_PARAM, TENANT_PARAM};
pub use queue::{Eligibility, ProcessingSet, QueueConfig, QueueRun, QueueSummary, SchedulerState};
pub use record::Record;
pub use snapshot::{ReplicaSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use tree::{default_queues, ResourceNode};

/// Type aliases for clarity
pub type QueueId = String;
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub use error::Result;
