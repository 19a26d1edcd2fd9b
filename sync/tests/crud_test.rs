//! Integration tests for the local CRUD surface and its audit trail.

mod common;

use canopy_engine::record::{CREATE_DATE_LOCAL, MODIFY_DATE_LOCAL};
use canopy_engine::{AuditMethod, Error, Params, StoreKey};
use canopy_sync::{
    LocalCrudApi, LocalStore, MemoryStore, ReadResult, SessionAuditLog, SharedSession, SyncError,
};
use common::{record, records};
use serde_json::json;
use std::sync::Arc;

fn api() -> (LocalCrudApi, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &StoreKey::from_raw("7_/projects"),
            records(json!([{"id": 1, "name": "Tower"}, {"id": 2, "name": "Depot"}])),
        )
        .unwrap();

    let session = Arc::new(SharedSession::signed_in(record(json!({"id": 7}))));
    let api = LocalCrudApi::new(store.clone(), session, Arc::new(SessionAuditLog::new()));
    (api, store)
}

fn stored_projects(store: &MemoryStore) -> Vec<canopy_engine::Record> {
    store
        .get(&StoreKey::from_raw("7_/projects"))
        .unwrap()
        .unwrap()
}

#[cfg(test)]
mod read_tests {
    use super::*;

    #[test]
    fn test_read_all_and_one() {
        let (api, _) = api();

        match api.read("projects", &Params::new(), None).unwrap() {
            ReadResult::Many(all) => assert_eq!(all.len(), 2),
            other => panic!("expected many, got {other:?}"),
        }

        let one = api.read("projects/2", &Params::new(), None).unwrap();
        assert_eq!(one, ReadResult::One(record(json!({"id": 2, "name": "Depot"}))));

        let one = api.read("projects", &Params::new(), Some("1")).unwrap();
        assert_eq!(one, ReadResult::One(record(json!({"id": 1, "name": "Tower"}))));
    }

    #[test]
    fn test_read_unknown_record_and_resource() {
        let (api, _) = api();

        let err = api.read("projects/99", &Params::new(), None).unwrap_err();
        assert!(matches!(err, SyncError::Engine(Error::RecordNotFound(_))));

        let err = api.read("suites", &Params::new(), None).unwrap_err();
        assert!(matches!(err, SyncError::Engine(Error::MissingResource(_))));
    }

    #[test]
    fn test_read_uses_filter_params_in_key() {
        let (api, store) = api();
        store
            .set(
                &StoreKey::from_raw("7_/suites?project_id=1"),
                records(json!([{"id": 10}])),
            )
            .unwrap();

        let params = Params::new().with("project_id", 1);
        match api.read("suites", &params, None).unwrap() {
            ReadResult::Many(suites) => assert_eq!(suites, records(json!([{"id": 10}]))),
            other => panic!("expected many, got {other:?}"),
        }
    }

    #[test]
    fn test_requires_session() {
        let store = Arc::new(MemoryStore::new());
        let api = LocalCrudApi::new(
            store,
            Arc::new(SharedSession::new()),
            Arc::new(SessionAuditLog::new()),
        );

        let err = api.read("projects", &Params::new(), None).unwrap_err();
        assert!(matches!(err, SyncError::NoSession));
    }
}

#[cfg(test)]
mod write_tests {
    use super::*;

    #[test]
    fn test_create_assigns_guid_and_audits_post() {
        let (api, store) = api();

        let created = api
            .create("projects", record(json!({"name": "Annex"})), &Params::new())
            .unwrap();

        let guid = created.guid().unwrap();
        assert_eq!(guid.len(), 32);
        assert!(created.contains(CREATE_DATE_LOCAL));
        assert_eq!(created.id(), None);

        let stored = stored_projects(&store);
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2], created);

        let entries = api.audit_log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, AuditMethod::Post);
        assert_eq!(entries[0].url, "projects");
        assert_eq!(entries[0].key.as_str(), "7_/projects");
        assert_eq!(entries[0].data["name"], json!("Annex"));
    }

    #[test]
    fn test_create_requires_stored_resource() {
        let (api, _) = api();
        let err = api
            .create("suites", record(json!({"name": "A"})), &Params::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::Engine(Error::MissingResource(_))));
        assert!(api.audit_log().is_empty());
    }

    #[test]
    fn test_update_numeric_record_audits_put() {
        let (api, store) = api();

        let updated = api
            .update("projects/1", record(json!({"name": "Tower B"})), None, &Params::new())
            .unwrap();

        assert_eq!(updated.id(), Some(1));
        assert_eq!(updated.get("name"), Some(&json!("Tower B")));
        assert!(updated.contains(MODIFY_DATE_LOCAL));
        assert_eq!(stored_projects(&store)[0], updated);

        let entries = api.audit_log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, AuditMethod::Put);
        assert_eq!(entries[0].options["id"], json!("1"));
    }

    #[test]
    fn test_pending_record_edits_are_not_audited() {
        let (api, store) = api();

        let created = api
            .create("projects", record(json!({"name": "Annex"})), &Params::new())
            .unwrap();
        let guid = created.guid().unwrap().to_string();

        api.update(
            "projects",
            record(json!({"name": "Annex 2"})),
            Some(&guid),
            &Params::new(),
        )
        .unwrap();
        api.remove("projects", Some(&guid), &Params::new()).unwrap();

        let methods: Vec<_> = api.audit_log().entries().iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![AuditMethod::Post]);
        assert_eq!(stored_projects(&store).len(), 2);
    }

    #[test]
    fn test_remove_numeric_record_audits_delete() {
        let (api, store) = api();

        let removed = api.remove("projects/2", None, &Params::new()).unwrap();
        assert_eq!(removed, record(json!({"id": 2, "name": "Depot"})));
        assert_eq!(
            stored_projects(&store),
            records(json!([{"id": 1, "name": "Tower"}]))
        );

        let entries = api.audit_log().drain();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].method, AuditMethod::Delete);
        assert!(api.audit_log().is_empty());
    }

    #[test]
    fn test_update_and_remove_need_a_lookup() {
        let (api, _) = api();

        let err = api
            .update("projects", record(json!({"name": "X"})), None, &Params::new())
            .unwrap_err();
        assert!(matches!(err, SyncError::Engine(Error::MissingIdentity)));

        let err = api.remove("projects/404", None, &Params::new()).unwrap_err();
        assert!(matches!(err, SyncError::Engine(Error::RecordNotFound(_))));
        assert!(api.audit_log().is_empty());
    }
}
