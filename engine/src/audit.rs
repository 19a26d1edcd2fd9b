//! Audit trail of local mutations.
//!
//! Entries are append-only and never read back by the engine. They exist so
//! that a diagnostics consumer can see which local changes still need to be
//! pushed to the server.

use crate::identity::Identity;
use crate::key::StoreKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutation kind, named after the HTTP verb it stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditMethod {
    Post,
    Put,
    Delete,
}

impl AuditMethod {
    /// Whether a mutation with this method on `target` is audited.
    ///
    /// Creates are always audited. Updates and removals are audited only for
    /// server-identified records; edits to pending records are folded into
    /// their eventual create.
    pub fn is_audited(self, target: Option<&Identity>) -> bool {
        match self {
            AuditMethod::Post => true,
            AuditMethod::Put | AuditMethod::Delete => target.is_some_and(Identity::is_numeric),
        }
    }
}

/// One audited mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub method: AuditMethod,
    /// Endpoint as the caller gave it
    pub url: String,
    /// Store key the mutation was applied to
    pub key: StoreKey,
    /// Record sent by the caller
    pub data: Value,
    /// Lookup id and extra parameters
    pub options: Value,
    /// Resulting record
    pub response: Value,
    /// ISO-8601 append time
    pub date: String,
}

/// Ordered, append-only list of entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn append(&mut self, entry: AuditLogEntry) {
        self.entries.push(entry);
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    /// Take all entries, leaving the log empty.
    pub fn drain(&mut self) -> Vec<AuditLogEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
