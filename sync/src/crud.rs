//! Local CRUD surface over the replica.
//!
//! Reads and writes go straight to the local store using the same keys and
//! merge rules as the puller. New records get a client guid until the server
//! assigns an id. Mutations that the server will need to hear about are
//! appended to the session audit log.

use crate::audit::SessionAuditLog;
use crate::error::{Result, SyncError};
use crate::session::Session;
use crate::store::LocalStore;
use canopy_engine::time::to_iso;
use canopy_engine::{
    classify, merge, AuditLogEntry, AuditMethod, Error, Identity, IdentityKind, Params, Record,
    StoreKey,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// A resource path with an optional trailing record identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Collection path, e.g. `projects`
    pub resource: String,
    /// Trailing identifier segment, e.g. `42` in `projects/42`
    pub lookup: Option<String>,
}

impl Endpoint {
    /// Split `projects/42` into `projects` and `42`.
    ///
    /// A single-segment endpoint has no lookup.
    pub fn parse(endpoint: &str) -> Self {
        let path = endpoint.split('?').next().unwrap_or_default().trim_matches('/');
        match path.rsplit_once('/') {
            Some((resource, tail)) if !resource.is_empty() && !tail.is_empty() => Self {
                resource: resource.to_string(),
                lookup: Some(tail.to_string()),
            },
            _ => Self {
                resource: path.to_string(),
                lookup: None,
            },
        }
    }
}

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadResult {
    /// The record addressed by a lookup
    One(Record),
    /// The whole stored sequence
    Many(Vec<Record>),
}

/// Generate a fresh client guid.
pub fn new_guid() -> String {
    loop {
        let guid = Uuid::new_v4().simple().to_string();
        // Hex strings like "12e4..." can read as numbers
        if classify(&guid) == IdentityKind::Guid {
            return guid;
        }
    }
}

/// CRUD operations against the local replica.
pub struct LocalCrudApi {
    store: Arc<dyn LocalStore>,
    session: Arc<dyn Session>,
    audit: Arc<SessionAuditLog>,
}

impl LocalCrudApi {
    /// Create the API over a store, session and audit log.
    pub fn new(
        store: Arc<dyn LocalStore>,
        session: Arc<dyn Session>,
        audit: Arc<SessionAuditLog>,
    ) -> Self {
        Self {
            store,
            session,
            audit,
        }
    }

    /// The audit log mutations are appended to.
    pub fn audit_log(&self) -> &Arc<SessionAuditLog> {
        &self.audit
    }

    /// Read a stored sequence, or one record of it.
    ///
    /// The lookup comes from `lookup` or, failing that, from the endpoint's
    /// trailing segment.
    pub fn read(
        &self,
        endpoint: &str,
        params: &Params,
        lookup: Option<&str>,
    ) -> Result<ReadResult> {
        let parsed = Endpoint::parse(endpoint);
        let key = self.key(&parsed.resource, params)?;
        let stored = self.load(&key)?;

        match lookup.or(parsed.lookup.as_deref()) {
            Some(raw) => {
                let identity = Identity::parse(raw)?;
                stored
                    .into_iter()
                    .find(|record| record.matches(&identity))
                    .map(ReadResult::One)
                    .ok_or_else(|| Error::RecordNotFound(raw.to_string()).into())
            }
            None => Ok(ReadResult::Many(stored)),
        }
    }

    /// Append a new, not yet synchronized record.
    ///
    /// The resource must have been stored before; there is no implicit
    /// creation of empty sequences.
    pub fn create(&self, endpoint: &str, mut record: Record, params: &Params) -> Result<Record> {
        let parsed = Endpoint::parse(endpoint);
        let key = self.key(&parsed.resource, params)?;
        let mut stored = self.load(&key)?;

        record.set_guid(new_guid());
        record.stamp_created(to_iso(Utc::now()));

        stored.push(record.clone());
        self.store.set(&key, stored)?;

        tracing::debug!(key = %key, guid = ?record.guid(), "Created local record");

        self.audit(AuditMethod::Post, endpoint, key, &record, None, params, &record);
        Ok(record)
    }

    /// Merge `record` into the stored record it identifies.
    pub fn update(
        &self,
        endpoint: &str,
        mut record: Record,
        lookup: Option<&str>,
        params: &Params,
    ) -> Result<Record> {
        let parsed = Endpoint::parse(endpoint);
        let raw = lookup
            .or(parsed.lookup.as_deref())
            .ok_or(Error::MissingIdentity)?;
        let identity = Identity::parse(raw)?;

        let key = self.key(&parsed.resource, params)?;
        let mut stored = self.load(&key)?;

        record.adopt_identity(&identity);
        record.stamp_modified(to_iso(Utc::now()));

        let merged = merge::upsert_one(&mut stored, &record)?.clone();
        self.store.set(&key, stored)?;

        tracing::debug!(key = %key, identity = %identity, "Updated local record");

        if AuditMethod::Put.is_audited(Some(&identity)) {
            self.audit(AuditMethod::Put, endpoint, key, &record, Some(raw), params, &merged);
        }
        Ok(merged)
    }

    /// Remove the stored record addressed by the lookup.
    pub fn remove(&self, endpoint: &str, lookup: Option<&str>, params: &Params) -> Result<Record> {
        let parsed = Endpoint::parse(endpoint);
        let raw = lookup
            .or(parsed.lookup.as_deref())
            .ok_or(Error::MissingIdentity)?;
        let identity = Identity::parse(raw)?;

        let key = self.key(&parsed.resource, params)?;
        let mut stored = self.load(&key)?;

        let removed = merge::remove_one(&mut stored, &identity)?;
        self.store.set(&key, stored)?;

        tracing::debug!(key = %key, identity = %identity, "Removed local record");

        if AuditMethod::Delete.is_audited(Some(&identity)) {
            self.audit(
                AuditMethod::Delete,
                endpoint,
                key,
                &Record::new(),
                Some(raw),
                params,
                &removed,
            );
        }
        Ok(removed)
    }

    fn key(&self, resource: &str, params: &Params) -> Result<StoreKey> {
        let tenant = self.session.builder_id().ok_or(SyncError::NoSession)?;
        Ok(StoreKey::new(resource, Some(&tenant), params))
    }

    fn load(&self, key: &StoreKey) -> Result<Vec<Record>> {
        self.store
            .get(key)?
            .ok_or_else(|| Error::MissingResource(key.to_string()).into())
    }

    #[allow(clippy::too_many_arguments)]
    fn audit(
        &self,
        method: AuditMethod,
        url: &str,
        key: StoreKey,
        data: &Record,
        lookup: Option<&str>,
        params: &Params,
        response: &Record,
    ) {
        let options = json!({
            "id": lookup,
            "endpoint": params,
        });

        self.audit.append(AuditLogEntry {
            method,
            url: url.to_string(),
            key,
            data: Value::from(data.clone()),
            options,
            response: Value::from(response.clone()),
            date: to_iso(Utc::now()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_endpoints() {
        assert_eq!(
            Endpoint::parse("projects/42"),
            Endpoint {
                resource: "projects".into(),
                lookup: Some("42".into())
            }
        );
        assert_eq!(
            Endpoint::parse("/projects/"),
            Endpoint {
                resource: "projects".into(),
                lookup: None
            }
        );
        assert_eq!(
            Endpoint::parse("a/b/c?x=1"),
            Endpoint {
                resource: "a/b".into(),
                lookup: Some("c".into())
            }
        );
    }

    #[test]
    fn guids_classify_as_guids() {
        for _ in 0..100 {
            let guid = new_guid();
            assert_eq!(guid.len(), 32);
            assert_eq!(classify(&guid), IdentityKind::Guid);
        }
    }
}
