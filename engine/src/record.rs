//! Record types for replicated data.
//!
//! A record is an open-ended JSON object. A handful of field names are reserved
//! for identity and local bookkeeping; everything else is payload owned by the
//! remote service.

use crate::identity::{numeric_from_value, Identity};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned numeric id.
pub const ID_FIELD: &str = "id";
/// Client-assigned opaque identifier.
pub const GUID_FIELD: &str = "guid";
/// Local-clock creation stamp.
pub const CREATE_DATE_LOCAL: &str = "create_date_local";
/// Local-clock modification stamp.
pub const MODIFY_DATE_LOCAL: &str = "modify_date_local";

/// A single replicated record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a record from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::InvalidRecord(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Get a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Check whether a field is set at all (including `null`).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Check whether a field holds a "present" value.
    ///
    /// `null`, `false`, `0` and the empty string count as absent, matching
    /// what the remote API treats as an unset filter.
    pub fn has_value(&self, field: &str) -> bool {
        self.0.get(field).is_some_and(is_present)
    }

    /// Iterate over all fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Server-assigned id, if the server has accepted this record.
    pub fn id(&self) -> Option<i64> {
        self.0.get(ID_FIELD).and_then(numeric_from_value)
    }

    /// Client-assigned guid, if any.
    pub fn guid(&self) -> Option<&str> {
        self.0
            .get(GUID_FIELD)
            .and_then(Value::as_str)
            .filter(|g| !g.is_empty())
    }

    /// Primary identity: `id` if present, else `guid`.
    pub fn identity(&self) -> Option<Identity> {
        self.id()
            .map(Identity::Numeric)
            .or_else(|| self.guid().map(|g| Identity::Guid(g.to_string())))
    }

    /// Primary identity, failing when the record has neither field.
    pub fn require_identity(&self) -> Result<Identity> {
        self.identity().ok_or(Error::MissingIdentity)
    }

    /// Check whether this record is addressed by the given identity.
    pub fn matches(&self, identity: &Identity) -> bool {
        match identity {
            Identity::Numeric(id) => self.id() == Some(*id),
            Identity::Guid(guid) => self.guid() == Some(guid.as_str()),
        }
    }

    /// Check whether two records refer to the same entity.
    ///
    /// They match on `id` when both carry one, otherwise on `guid`.
    pub fn same_entity(&self, other: &Record) -> bool {
        if let (Some(a), Some(b)) = (self.id(), other.id()) {
            if a == b {
                return true;
            }
        }
        matches!((self.guid(), other.guid()), (Some(a), Some(b)) if a == b)
    }

    /// Assign the client guid.
    pub fn set_guid(&mut self, guid: impl Into<String>) {
        self.0.insert(GUID_FIELD.to_string(), Value::String(guid.into()));
    }

    /// Write an identity into its field if the record has no identity yet.
    pub fn adopt_identity(&mut self, identity: &Identity) {
        if self.identity().is_none() {
            self.0
                .insert(identity.kind().field().to_string(), identity.to_value());
        }
    }

    /// Stamp the local creation time.
    pub fn stamp_created(&mut self, iso_timestamp: impl Into<String>) {
        self.0
            .insert(CREATE_DATE_LOCAL.to_string(), Value::String(iso_timestamp.into()));
    }

    /// Stamp the local modification time.
    pub fn stamp_modified(&mut self, iso_timestamp: impl Into<String>) {
        self.0
            .insert(MODIFY_DATE_LOCAL.to_string(), Value::String(iso_timestamp.into()));
    }

    /// Shallow-merge another record's fields over this one.
    pub fn overlay(&mut self, other: &Record) {
        for (field, value) in other.fields() {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Consume into the underlying JSON object.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Record::from_value(value)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Whether a JSON value counts as set.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
