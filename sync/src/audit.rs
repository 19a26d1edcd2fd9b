//! Session-scoped audit trail shared by the CRUD surface and its consumers.

use canopy_engine::{AuditLog, AuditLogEntry};
use std::sync::{Mutex, PoisonError};

/// Thread-safe wrapper around the engine's [`AuditLog`].
#[derive(Debug, Default)]
pub struct SessionAuditLog {
    inner: Mutex<AuditLog>,
}

impl SessionAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn append(&self, entry: AuditLogEntry) {
        tracing::debug!(method = ?entry.method, key = %entry.key, "Audit entry appended");
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .append(entry);
    }

    /// Copy of all entries, oldest first.
    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    /// Hand all entries to a consumer, emptying the log.
    pub fn drain(&self) -> Vec<AuditLogEntry> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
