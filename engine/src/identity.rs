//! Record identity: server-assigned numeric ids and client-assigned guids.
//!
//! A record is addressed by exactly one primary identity at a time. Before the
//! server has accepted it, a record only carries a `guid`; once synchronized it
//! carries a numeric `id` which takes precedence.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of a value for it to be treated as a guid.
pub const GUID_MIN_LEN: usize = 32;

/// Which identity field a raw lookup value addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    /// Matches against the `id` field
    Numeric,
    /// Matches against the `guid` field
    Guid,
}

impl IdentityKind {
    /// Record field this kind is matched against.
    pub fn field(self) -> &'static str {
        match self {
            IdentityKind::Numeric => crate::record::ID_FIELD,
            IdentityKind::Guid => crate::record::GUID_FIELD,
        }
    }
}

/// Returns true when the value reads as a finite number.
pub fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

/// Classify a raw lookup value.
///
/// A value is a guid when it is not numeric and is at least
/// [`GUID_MIN_LEN`] characters long. Everything else addresses `id`.
pub fn classify(value: &str) -> IdentityKind {
    if !is_numeric(value) && value.chars().count() >= GUID_MIN_LEN {
        IdentityKind::Guid
    } else {
        IdentityKind::Numeric
    }
}

/// A resolved primary identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Identity {
    /// Server-assigned id
    Numeric(i64),
    /// Client-assigned opaque identifier
    Guid(String),
}

impl Identity {
    /// Parse a raw lookup value (for example the trailing segment of an
    /// endpoint) into an identity.
    pub fn parse(value: &str) -> Result<Self> {
        match classify(value) {
            IdentityKind::Guid => Ok(Identity::Guid(value.to_string())),
            IdentityKind::Numeric => parse_numeric(value)
                .map(Identity::Numeric)
                .ok_or_else(|| Error::InvalidIdentity(value.to_string())),
        }
    }

    /// Identity kind of this value.
    pub fn kind(&self) -> IdentityKind {
        match self {
            Identity::Numeric(_) => IdentityKind::Numeric,
            Identity::Guid(_) => IdentityKind::Guid,
        }
    }

    /// Whether the server has assigned this identity.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Identity::Numeric(_))
    }

    /// JSON form of the identity as it would appear in its record field.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            Identity::Numeric(id) => serde_json::Value::from(*id),
            Identity::Guid(guid) => serde_json::Value::from(guid.as_str()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Numeric(id) => write!(f, "{id}"),
            Identity::Guid(guid) => f.write_str(guid),
        }
    }
}

/// Integer id from a string, accepting integral floats like `"12.0"`.
pub(crate) fn parse_numeric(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(id) = trimmed.parse::<i64>() {
        return Some(id);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Numeric id from a JSON value holding either a number or a numeric string.
pub(crate) fn numeric_from_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
                .map(|v| v as i64)
        }),
        serde_json::Value::String(s) if is_numeric(s) => parse_numeric(s),
        _ => None,
    }
}
