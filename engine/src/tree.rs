//! Resource trees: what to fetch and how parent fields scope child requests.

use crate::key::Params;
use crate::queue::QueueConfig;
use crate::{Error, Record, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fetchable resource and the children fetched once per parent record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Logical name, used for instrumentation
    pub name: String,
    /// Remote resource path
    pub url: String,
    /// Child request parameter -> parent context field
    #[serde(default)]
    pub resolve: BTreeMap<String, String>,
    /// Resources fetched once per record of this one
    #[serde(default, rename = "childNodes")]
    pub children: Vec<ResourceNode>,
}

impl ResourceNode {
    /// Create a leaf node with no parameter resolution.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            resolve: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Add a resolve rule: request param `param` takes the parent's `field`.
    pub fn resolve(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.resolve.insert(param.into(), field.into());
        self
    }

    /// Add a child node.
    pub fn child(mut self, node: ResourceNode) -> Self {
        self.children.push(node);
        self
    }

    /// Whether any resources hang below this one.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Request parameters for fetching this node under `context`.
    ///
    /// Parent fields that are absent (or falsy) are omitted rather than
    /// defaulted. When `modified_since` is given it is attached as the
    /// incremental filter.
    pub fn request_params(&self, context: &Record, modified_since: Option<&str>) -> Params {
        let mut params = Params::new();
        for (param, field) in &self.resolve {
            if context.has_value(field) {
                if let Some(value) = context.get(field) {
                    params.insert(param.clone(), value.clone());
                }
            }
        }
        if let Some(since) = modified_since {
            params.set_modified_since(since);
        }
        params
    }

    /// Parent contexts for this node's children.
    ///
    /// Each fetched record is overlaid with the parameters used to fetch it,
    /// so scope fields resolved higher up stay visible further down.
    pub fn child_contexts(params: &Params, fetched: &[Record]) -> Vec<Record> {
        fetched
            .iter()
            .map(|record| params.overlay_onto(record))
            .collect()
    }

    /// Validate this node and its subtree.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidConfig(format!(
                "resource with url '{}' has no name",
                self.url
            )));
        }
        if self.url.trim_matches('/').is_empty() {
            return Err(Error::InvalidConfig(format!(
                "resource '{}' has no url",
                self.name
            )));
        }
        if let Some((param, _)) = self
            .resolve
            .iter()
            .find(|(param, field)| param.is_empty() || field.is_empty())
        {
            return Err(Error::InvalidConfig(format!(
                "resource '{}' has an empty resolve rule for '{}'",
                self.name, param
            )));
        }
        self.children.iter().try_for_each(ResourceNode::validate)
    }

    /// Number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ResourceNode::node_count).sum::<usize>()
    }
}

/// The queues this replica synchronizes.
///
/// The bulk queue pulls the project hierarchy once an hour and must run
/// alone; the fast queue refreshes inspection events every minute.
pub fn default_queues() -> Vec<QueueConfig> {
    let suite_contacts = ResourceNode::new("suite_contacts", "suitecontacts")
        .resolve("suite_id", "id")
        .resolve("project_id", "project_id")
        .resolve("builder_id", "builder_id");

    let suites = ResourceNode::new("suites", "suites")
        .resolve("project_id", "id")
        .resolve("builder_id", "builder_id")
        .child(suite_contacts);

    let form_types = ResourceNode::new("form_types", "formtypes")
        .resolve("project_id", "id")
        .resolve("builder_id", "builder_id");

    let projects = ResourceNode::new("projects", "projects")
        .resolve("builder_id", "id")
        .child(suites)
        .child(form_types);

    let inspection_events =
        ResourceNode::new("inspection_events", "inspectionevents").resolve("builder_id", "id");

    vec![
        QueueConfig::new("bulk", 3600).exclusive().root(projects),
        QueueConfig::new("fast", 60).root(inspection_events),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn resolves_present_fields_only() {
        let node = ResourceNode::new("suites", "suites")
            .resolve("project_id", "id")
            .resolve("builder_id", "builder_id");

        let params = node.request_params(&record(json!({"id": 4})), None);
        assert_eq!(params, Params::new().with("project_id", 4));
    }

    #[test]
    fn attaches_incremental_filter() {
        let node = ResourceNode::new("projects", "projects").resolve("builder_id", "id");
        let params = node.request_params(
            &record(json!({"id": 7})),
            Some("2024-03-01T12:00:00.000Z"),
        );
        assert_eq!(params.modified_since(), Some("2024-03-01T12:00:00.000Z"));
        assert_eq!(params.tenant_scope().as_deref(), Some("7"));
    }

    #[test]
    fn child_contexts_carry_scope() {
        let params = Params::new().with("builder_id", 7).with("project_id", 3);
        let fetched = vec![record(json!({"id": 11, "name": "suite"}))];

        let contexts = ResourceNode::child_contexts(&params, &fetched);
        assert_eq!(
            serde_json::Value::from(contexts[0].clone()),
            json!({"id": 11, "name": "suite", "builder_id": 7, "project_id": 3})
        );
    }

    #[test]
    fn grandchild_sees_grandparent_scope() {
        let queues = default_queues();
        let projects = &queues[0].roots[0];
        let suites = &projects.children[0];
        let contacts = &suites.children[0];

        let builder = record(json!({"id": 7}));
        let p_params = projects.request_params(&builder, None);
        let p_ctx = ResourceNode::child_contexts(&p_params, &[record(json!({"id": 3}))]);

        let s_params = suites.request_params(&p_ctx[0], None);
        let s_ctx = ResourceNode::child_contexts(&s_params, &[record(json!({"id": 11}))]);

        let c_params = contacts.request_params(&s_ctx[0], None);
        assert_eq!(
            c_params,
            Params::new()
                .with("builder_id", 7)
                .with("project_id", 3)
                .with("suite_id", 11)
        );
    }

    #[test]
    fn default_queues_are_valid() {
        let queues = default_queues();
        for queue in &queues {
            queue.validate().unwrap();
        }
        assert_eq!(queues[0].roots[0].node_count(), 4);
        assert!(queues[0].exclusive);
        assert!(!queues[1].exclusive);
    }

    #[test]
    fn validate_rejects_missing_url() {
        let node = ResourceNode::new("x", "x").child(ResourceNode::new("y", "/"));
        assert!(matches!(node.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn deserializes_declarative_tree() {
        let node: ResourceNode = serde_json::from_value(json!({
            "name": "projects",
            "url": "projects",
            "resolve": {"builder_id": "id"},
            "childNodes": [{"name": "suites", "url": "suites"}]
        }))
        .unwrap();
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].resolve.is_empty());
    }
}
