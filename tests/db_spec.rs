use momentum_sync::db::Database;
use momentum_sync::error::StoreError;
use momentum_sync::models::{Credential, CredentialRecord};
use momentum_sync::store::{CredentialStore, DocumentRef, TaskStore};
use serde_json::json;
use speculate2::speculate;

fn credential(access_token: &str) -> CredentialRecord {
    CredentialRecord::from(Credential {
        access_token: access_token.to_string(),
        refresh_token: Some("refresh".to_string()),
        expiry_date: Some(1_700_000_000_000),
        email: Some("someone@example.com".to_string()),
        created_at: None,
    })
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "documents" {
        describe "get_document" {
            it "returns None for a missing document" {
                let doc = db.get_document("users/u1/tasks/list").expect("Query failed");
                assert!(doc.is_none());
            }

            it "rejects collection paths" {
                let err = db.get_document("users/u1/tasks").unwrap_err();
                assert!(matches!(err, StoreError::InvalidPath(_)));
            }
        }

        describe "set_document" {
            it "stores and returns the document" {
                db.set_document("users/u1/tasks/list", json!({"list": []}), false)
                    .expect("Write failed");

                let doc = db.get_document("users/u1/tasks/list").expect("Query failed");
                assert_eq!(doc, Some(json!({"list": []})));
            }

            it "replaces the whole document without merge" {
                db.set_document("settings/app", json!({"a": 1, "b": 2}), false).unwrap();
                db.set_document("settings/app", json!({"b": 3}), false).unwrap();

                let doc = db.get_document("settings/app").unwrap();
                assert_eq!(doc, Some(json!({"b": 3})));
            }

            it "merges nested objects with merge" {
                db.set_document(
                    "users/u1/private/credentials",
                    json!({"googleCalendar": {"access_token": "a", "refresh_token": "r"}}),
                    false,
                ).unwrap();
                db.set_document(
                    "users/u1/private/credentials",
                    json!({"googleCalendar": {"access_token": "b"}}),
                    true,
                ).unwrap();

                let doc = db.get_document("users/u1/private/credentials").unwrap();
                assert_eq!(
                    doc,
                    Some(json!({"googleCalendar": {"access_token": "b", "refresh_token": "r"}}))
                );
            }

            it "merge into a missing document creates it" {
                db.set_document("settings/app", json!({"a": 1}), true).unwrap();
                assert_eq!(db.get_document("settings/app").unwrap(), Some(json!({"a": 1})));
            }

            it "rejects non-object documents" {
                let err = db.set_document("settings/app", json!([1, 2]), false).unwrap_err();
                assert!(matches!(err, StoreError::MalformedRecord { .. }));
            }
        }

        describe "delete_document" {
            it "reports whether a document was removed" {
                db.set_document("settings/app", json!({}), false).unwrap();
                assert!(db.delete_document("settings/app").unwrap());
                assert!(!db.delete_document("settings/app").unwrap());
            }
        }

        describe "find_non_empty" {
            it "returns owners of documents with a non-empty string field" {
                db.set_document("users/u2/private/credentials", json!({"googleCalendar": {"access_token": "x"}}), false).unwrap();
                db.set_document("users/u1/private/credentials", json!({"googleCalendar": {"access_token": "y"}}), false).unwrap();
                db.set_document("users/u3/private/credentials", json!({"googleCalendar": {"access_token": ""}}), false).unwrap();
                db.set_document("users/u4/private/credentials", json!({"googleCalendar": {"access_token": 42}}), false).unwrap();

                let refs = db.find_non_empty("googleCalendar.access_token").unwrap();
                assert_eq!(refs, vec![
                    DocumentRef { path: "users/u1/private/credentials".to_string(), owner: Some("u1".to_string()) },
                    DocumentRef { path: "users/u2/private/credentials".to_string(), owner: Some("u2".to_string()) },
                ]);
            }

            it "rejects unsafe field paths" {
                let err = db.find_non_empty("a') OR 1=1 --").unwrap_err();
                assert!(matches!(err, StoreError::InvalidField(_)));
            }
        }
    }

    describe "credential store" {
        it "round-trips a typed credential" {
            let record = credential("token");
            db.set_credentials("users/u1/private/credentials", &record, false).unwrap();

            let loaded = db.get_credentials("users/u1/private/credentials").unwrap();
            assert_eq!(loaded, Some(record));
        }

        it "fails with MalformedRecord for the wrong shape" {
            db.set_document(
                "users/u1/private/credentials",
                json!({"googleCalendar": {"access_token": 7}}),
                false,
            ).unwrap();

            let err = db.get_credentials("users/u1/private/credentials").unwrap_err();
            assert!(matches!(err, StoreError::MalformedRecord { ref path, .. } if path == "users/u1/private/credentials"));
        }

        it "discovers documents by access token" {
            db.set_credentials("users/u1/private/credentials", &credential("t"), false).unwrap();
            db.set_credentials("users/u2/private/credentials", &CredentialRecord::default(), false).unwrap();

            let refs = db.find_with_access_token().unwrap();
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].owner.as_deref(), Some("u1"));
        }
    }

    describe "task store" {
        it "decodes the task list" {
            db.set_document(
                "users/u1/tasks/list",
                json!({"list": [{"id": "t1", "text": "Write", "dueDate": "2024-01-01", "completed": false}]}),
                false,
            ).unwrap();

            let record = db.get_task_list("users/u1/tasks/list").unwrap().unwrap();
            assert_eq!(record.list.len(), 1);
            assert_eq!(record.list[0].id, "t1");
            assert!(record.list[0].start_time.is_none());
        }

        it "sets aside a scheduled entry that has no id" {
            db.set_document(
                "users/u1/tasks/list",
                json!({"list": [
                    {"id": "t1", "text": "ok"},
                    {"text": "x", "startTime": "09:00", "endTime": "10:00"}
                ]}),
                false,
            ).unwrap();

            let record = db.get_task_list("users/u1/tasks/list").unwrap().unwrap();
            assert_eq!(record.list.len(), 1);
            assert_eq!(record.rejected.len(), 1);
            assert_eq!(record.rejected[0].task_id, "#1");
        }

        it "fails with MalformedRecord when list is not an array" {
            db.set_document("users/u1/tasks/list", json!({"list": {"t1": {}}}), false).unwrap();

            let err = db.get_task_list("users/u1/tasks/list").unwrap_err();
            assert!(matches!(err, StoreError::MalformedRecord { .. }));
        }
    }
}

#[test]
fn persists_documents_across_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("momentum.db");

    {
        let db = Database::open(path.clone()).expect("Failed to open database");
        db.migrate().expect("Failed to migrate");
        db.set_document("users/u1/tasks/list", json!({"list": []}), false)
            .unwrap();
    }

    let db = Database::open(path).expect("Failed to reopen database");
    db.migrate().expect("Failed to migrate");
    assert_eq!(
        db.get_document("users/u1/tasks/list").unwrap(),
        Some(json!({"list": []}))
    );
}
