//! # Canopy Sync
//!
//! Runtime half of the canopy offline replica: a fixed-cadence scheduler
//! that pulls resource trees from the remote API into a local store, and a
//! local CRUD surface that reads and edits the replica while offline.
//!
//! Pure rules (identity, keys, merge, queue eligibility) live in
//! `canopy-engine`; this crate adds the IO around them.
//!
//! ```no_run
//! use canopy_engine::{default_queues, Record};
//! use canopy_sync::{HttpFetcher, MemoryStore, SharedSession, SyncScheduler, TreePuller};
//! use serde_json::json;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let fetcher = Arc::new(HttpFetcher::new(
//!     "https://api.example.com",
//!     None,
//!     Duration::from_secs(30),
//! )?);
//! let session = Arc::new(SharedSession::signed_in(Record::from_value(json!({"id": 7}))?));
//!
//! let scheduler = SyncScheduler::new(
//!     default_queues(),
//!     TreePuller::new(store, fetcher),
//!     session,
//!     Duration::from_secs(1),
//! )?;
//! let (_stop, shutdown) = tokio::sync::watch::channel(false);
//! scheduler.run(shutdown).await;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod crud;
pub mod error;
pub mod puller;
pub mod remote;
pub mod scheduler;
pub mod session;
pub mod store;

pub use audit::SessionAuditLog;
pub use config::{Config, ConfigError};
pub use crud::{new_guid, Endpoint, LocalCrudApi, ReadResult};
pub use error::{FetchError, Result, SyncError};
pub use puller::{RunProgress, RunReport, TreePuller};
pub use remote::{FetchOptions, HttpFetcher, RemoteFetcher};
pub use scheduler::{QueueStatus, SyncScheduler};
pub use session::{Session, SharedSession};
pub use store::{JsonFileStore, LocalStore, MemoryStore};
