//! Upsert rules shared by the puller and the local CRUD surface.
//!
//! Merges are last-write-wins by identity. An incremental fetch can only add
//! or update records; a full fetch replaces the stored sequence outright so
//! records deleted upstream disappear locally.

use crate::identity::Identity;
use crate::{Error, Record, Result};
use std::collections::HashMap;

/// Merge a single record into a stored sequence in place.
///
/// The target is the first stored record whose `id` equals the incoming `id`,
/// or failing that whose `guid` equals the incoming `guid`. Its fields are
/// shallow-merged with the incoming fields taking precedence. When nothing
/// matches, `stored` is left untouched and [`Error::RecordNotFound`] is
/// returned.
pub fn upsert_one<'a>(stored: &'a mut [Record], incoming: &Record) -> Result<&'a Record> {
    let index = stored
        .iter()
        .position(|existing| existing.same_entity(incoming))
        .ok_or_else(|| {
            Error::RecordNotFound(
                incoming
                    .identity()
                    .map(|identity| identity.to_string())
                    .unwrap_or_else(|| "<unidentified>".to_string()),
            )
        })?;

    let target = &mut stored[index];
    target.overlay(incoming);
    Ok(target)
}

/// Union of `stored` and `incoming`, keyed by identity.
///
/// Incoming records replace stored records with the same identity. Stored
/// order is preserved and new records are appended in arrival order; callers
/// must not rely on that order. Records without any identity are kept as-is.
pub fn upsert_many(stored: Vec<Record>, incoming: Vec<Record>) -> Vec<Record> {
    let mut index: HashMap<Identity, usize> = HashMap::with_capacity(stored.len());
    let mut result = Vec::with_capacity(stored.len() + incoming.len());

    for record in stored {
        match record.identity() {
            Some(identity) => match index.get(&identity) {
                Some(&slot) => result[slot] = record,
                None => {
                    index.insert(identity, result.len());
                    result.push(record);
                }
            },
            None => result.push(record),
        }
    }

    for record in incoming {
        match record.identity() {
            Some(identity) => match index.get(&identity) {
                Some(&slot) => result[slot] = record,
                None => {
                    index.insert(identity, result.len());
                    result.push(record);
                }
            },
            None => result.push(record),
        }
    }

    result
}

/// Decide how freshly fetched records combine with what is stored.
///
/// Only an incremental fetch over a non-empty stored sequence is merged;
/// everything else replaces the stored sequence.
pub fn merge_fetched(
    stored: Option<Vec<Record>>,
    fetched: Vec<Record>,
    incremental: bool,
) -> Vec<Record> {
    match stored {
        Some(stored) if incremental && !stored.is_empty() => upsert_many(stored, fetched),
        _ => fetched,
    }
}

/// Position of the record addressed by `identity`.
pub fn find_position(records: &[Record], identity: &Identity) -> Option<usize> {
    records.iter().position(|r| r.matches(identity))
}

/// Remove and return the record addressed by `identity`.
pub fn remove_one(records: &mut Vec<Record>, identity: &Identity) -> Result<Record> {
    find_position(records, identity)
        .map(|index| records.remove(index))
        .ok_or_else(|| Error::RecordNotFound(identity.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records(value: Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn sorted_by_id(mut records: Vec<Record>) -> Vec<Value> {
        records.sort_by_key(|r| r.id());
        records.into_iter().map(Value::from).collect()
    }

    #[test]
    fn upsert_many_incoming_wins() {
        let stored = records(json!([{"id": 1, "a": "x"}]));
        let incoming = records(json!([{"id": 1, "a": "y"}, {"id": 2, "a": "z"}]));

        let merged = upsert_many(stored, incoming);
        assert_eq!(
            sorted_by_id(merged),
            vec![json!({"id": 1, "a": "y"}), json!({"id": 2, "a": "z"})]
        );
    }

    #[test]
    fn upsert_many_keeps_pending_records() {
        let stored = records(json!([
            {"id": 1, "a": "x"},
            {"guid": "6f1c2b9a8e7d4c3ba1f0e9d8c7b6a5f4", "a": "local"}
        ]));
        let incoming = records(json!([{"id": 3, "a": "new"}]));

        let merged = upsert_many(stored, incoming);
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().any(|r| r.guid().is_some() && r.id().is_none()));
    }

    #[test]
    fn upsert_many_replaces_whole_record() {
        let stored = records(json!([{"id": 1, "a": "x", "b": "keep?"}]));
        let incoming = records(json!([{"id": 1, "a": "y"}]));

        let merged = upsert_many(stored, incoming);
        assert_eq!(merged, records(json!([{"id": 1, "a": "y"}])));
    }

    #[test]
    fn upsert_one_merges_in_place() {
        let mut stored = records(json!([{"id": 1, "a": "x", "b": 1}, {"id": 2}]));
        let incoming = Record::from_value(json!({"id": 1, "a": "y"})).unwrap();

        let updated = upsert_one(&mut stored, &incoming).unwrap().clone();
        assert_eq!(Value::from(updated), json!({"id": 1, "a": "y", "b": 1}));
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn upsert_one_matches_guid() {
        let mut stored = records(json!([{"guid": "g", "a": 1}]));
        let incoming = Record::from_value(json!({"guid": "g", "a": 2})).unwrap();

        upsert_one(&mut stored, &incoming).unwrap();
        assert_eq!(stored[0].get("a"), Some(&json!(2)));
    }

    #[test]
    fn upsert_one_not_found_leaves_stored() {
        let mut stored = records(json!([{"id": 1, "a": "x"}]));
        let before = stored.clone();
        let incoming = Record::from_value(json!({"id": 5, "a": "y"})).unwrap();

        let result = upsert_one(&mut stored, &incoming);
        assert_eq!(result, Err(Error::RecordNotFound("5".into())));
        assert_eq!(stored, before);
    }

    #[test]
    fn merge_fetched_replaces_without_filter() {
        let stored = records(json!([{"id": 1}, {"id": 2}]));
        let fetched = records(json!([{"id": 2}]));
        assert_eq!(merge_fetched(Some(stored), fetched.clone(), false), fetched);
    }

    #[test]
    fn merge_fetched_merges_incrementally() {
        let stored = records(json!([{"id": 1}, {"id": 2}]));
        let fetched = records(json!([{"id": 2, "v": 1}]));
        let merged = merge_fetched(Some(stored), fetched, true);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_fetched_replaces_empty_stored() {
        let fetched = records(json!([{"id": 2}]));
        assert_eq!(merge_fetched(Some(vec![]), fetched.clone(), true), fetched);
        assert_eq!(merge_fetched(None, fetched.clone(), true), fetched);
    }

    #[test]
    fn remove_by_identity() {
        let mut stored = records(json!([{"id": 1}, {"guid": "g"}]));
        let removed = remove_one(&mut stored, &Identity::Guid("g".into())).unwrap();
        assert_eq!(removed.guid(), Some("g"));
        assert_eq!(stored.len(), 1);

        assert!(matches!(
            remove_one(&mut stored, &Identity::Numeric(9)),
            Err(Error::RecordNotFound(_))
        ));
    }
}
