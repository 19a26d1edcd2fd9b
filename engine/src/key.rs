//! Request parameters and canonical store keys.
//!
//! Every stored sequence lives under a [`StoreKey`] derived from the resource
//! path, the tenant (builder) scope and the remaining query parameters. System
//! parameters never reach the key, so a full fetch and any number of
//! incremental fetches of the same resource all land on the same sequence.

use crate::record::{is_present, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Parameter carrying the tenant (builder) scope.
pub const TENANT_PARAM: &str = "builder_id";

/// Parameter carrying the incremental filter timestamp.
pub const MODIFIED_SINCE_PARAM: &str = "modify_date";

/// Parameters excluded from store keys.
pub const SYSTEM_PARAMS: [&str; 2] = [TENANT_PARAM, MODIFIED_SINCE_PARAM];

/// Request parameters, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(name.into(), value.into())
    }

    /// Get a parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Remove a parameter.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Check whether a parameter is set.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tenant scope carried by these parameters, if any.
    pub fn tenant_scope(&self) -> Option<String> {
        self.0
            .get(TENANT_PARAM)
            .filter(|v| is_present(v))
            .and_then(scalar_string)
    }

    /// Attach the incremental filter timestamp.
    pub fn set_modified_since(&mut self, iso_timestamp: impl Into<String>) {
        self.0.insert(
            MODIFIED_SINCE_PARAM.to_string(),
            Value::String(iso_timestamp.into()),
        );
    }

    /// Incremental filter timestamp, if set.
    pub fn modified_since(&self) -> Option<&str> {
        self.0.get(MODIFIED_SINCE_PARAM).and_then(Value::as_str)
    }

    /// Whether this request is filtered incrementally.
    pub fn is_incremental(&self) -> bool {
        self.0.get(MODIFIED_SINCE_PARAM).is_some_and(is_present)
    }

    /// Copy of these parameters with system parameters removed.
    pub fn without_system(&self) -> Params {
        self.0
            .iter()
            .filter(|(name, _)| !SYSTEM_PARAMS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Flatten into `name=value` pairs, in name order.
    ///
    /// `null` values are dropped and arrays expand to one pair per element.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (name, value) in &self.0 {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = scalar_string(item) {
                            pairs.push((name.clone(), s));
                        }
                    }
                }
                other => {
                    if let Some(s) = scalar_string(other) {
                        pairs.push((name.clone(), s));
                    }
                }
            }
        }
        pairs
    }

    /// URL-encoded query string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_pairs())
            .finish()
    }

    /// Fields of `record` overlaid with these parameters.
    ///
    /// Used to hand a parent's request scope down to its children.
    pub fn overlay_onto(&self, record: &Record) -> Record {
        let mut merged = record.clone();
        for (name, value) in &self.0 {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }
}

impl FromIterator<(String, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Canonical key of a stored record sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);

impl StoreKey {
    /// Build a key from a resource path, an optional tenant scope and the
    /// request parameters. System parameters are ignored.
    pub fn new(resource_path: &str, tenant_scope: Option<&str>, params: &Params) -> Self {
        let mut key = String::new();

        if let Some(tenant) = tenant_scope.filter(|t| !t.is_empty()) {
            key.push_str(tenant);
            key.push('_');
        }

        key.push('/');
        key.push_str(resource_path.trim_matches('/'));

        let query = params.without_system().to_query_string();
        if !query.is_empty() {
            key.push('?');
            key.push_str(&query);
        }

        Self(key)
    }

    /// Key for a remote request, taking the tenant scope from the parameters.
    pub fn for_request(url: &str, params: &Params) -> Self {
        let tenant = params.tenant_scope();
        Self::new(url, tenant.as_deref(), params)
    }

    /// Wrap an already-canonical key string.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
