use std::sync::Arc;

use ndpr_consent::{
    requests::{REQUEST_STORAGE_KEY, RequestErrorKind, RequestService, RequestStatus, RequestType},
    storage::{InMemoryStore, SafeStorage},
};
use uuid::Uuid;

use crate::{EPOCH_MS, clocked_storage};

#[test]
fn given_valid_request_when_created_then_it_is_stored_as_pending() {
    let (store, _, storage) = clocked_storage();
    let service = RequestService::new(storage);

    let request = service
        .create_request(
            RequestType::Access,
            "John Doe",
            "John@Example.com",
            "Please send me my data",
        )
        .expect("request should be created");

    assert_eq!(request.request_type, RequestType::Access);
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.created_at, EPOCH_MS);
    assert_eq!(request.updated_at, EPOCH_MS);
    assert_eq!(request.subject.email, "john@example.com");
    assert_eq!(request.id.get_version_num(), 4);

    let stored = service.get_request(request.id).expect("request should be stored");
    assert_eq!(stored, request);

    let raw = store.peek(REQUEST_STORAGE_KEY).expect("array should be persisted");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("stored JSON");
    assert_eq!(json[0]["type"], "access");
    assert_eq!(json[0]["status"], "pending");
    assert_eq!(json[0]["createdAt"], EPOCH_MS);
}

#[test]
fn given_existing_request_when_status_updated_then_change_is_persisted() {
    let (_, clock, storage) = clocked_storage();
    let service = RequestService::new(storage);
    let request = service
        .create_request(RequestType::Erasure, "Ada", "ada@example.com", "Delete it")
        .expect("request should be created");

    clock.advance_days(1);
    let updated = service
        .update_status(request.id, RequestStatus::Completed)
        .expect("update should persist")
        .expect("request should exist");

    assert_eq!(updated.status, RequestStatus::Completed);
    assert!(updated.updated_at > request.updated_at);
    assert_eq!(updated.created_at, request.created_at);
    assert_eq!(
        service.get_request(request.id).map(|stored| stored.status),
        Some(RequestStatus::Completed)
    );
}

#[test]
fn given_unknown_id_when_status_updated_then_none_is_returned() {
    let (_, _, storage) = clocked_storage();
    let service = RequestService::new(storage);

    let outcome = service
        .update_status(Uuid::new_v4(), RequestStatus::Rejected)
        .expect("nothing to persist");
    assert!(outcome.is_none());
    assert!(service.get_request(Uuid::new_v4()).is_none());
}

#[test]
fn given_several_requests_when_listed_then_all_are_returned_and_clear_empties() {
    let (_, _, storage) = clocked_storage();
    let service = RequestService::new(storage);
    service
        .create_request(RequestType::Portability, "A", "a@example.com", "")
        .expect("request should be created");
    service
        .create_request(RequestType::Objection, "B", "b@example.com", "Stop marketing")
        .expect("request should be created");

    assert_eq!(service.all_requests().len(), 2);
    assert!(service.clear());
    assert!(service.all_requests().is_empty());
}

#[test]
fn given_markup_in_fields_when_created_then_it_is_neutralized() {
    let (_, _, storage) = clocked_storage();
    let service = RequestService::new(storage);

    let request = service
        .create_request(
            RequestType::Rectification,
            "<b>Eve</b>",
            "eve@example.com",
            "<script>alert(1)</script>Fix my <i>name</i>",
        )
        .expect("request should be created");

    assert_eq!(request.subject.name, "&lt;b&gt;Eve&lt;/b&gt;");
    assert!(!request.description.contains("<script"));
    assert!(!request.description.contains("alert(1)"));
    assert!(request.description.contains("Fix my &lt;i&gt;name&lt;/i&gt;"));
}

#[test]
fn given_invalid_input_when_creating_then_request_is_rejected_and_nothing_stored() {
    let (_, _, storage) = clocked_storage();
    let service = RequestService::new(storage);

    for (name, email) in [("", "a@example.com"), ("Ada", "not-an-email"), ("Ada", "")] {
        let err = service
            .create_request(RequestType::Restriction, name, email, "details")
            .expect_err("invalid request must fail");
        assert_eq!(err.kind, RequestErrorKind::InvalidRequest, "{name:?} {email:?}");
    }
    assert!(service.all_requests().is_empty());
}

#[test]
fn given_unavailable_store_when_creating_then_persistence_error_is_returned() {
    let storage = SafeStorage::new(Arc::new(InMemoryStore::unavailable()));
    let service = RequestService::new(storage);

    let err = service
        .create_request(RequestType::Access, "Ada", "ada@example.com", "")
        .expect_err("disabled store must fail");
    assert_eq!(err.kind, RequestErrorKind::Persistence);
    assert!(err.message.contains("storage may be full or unavailable"));
}

fn foreign_request() -> serde_json::Value {
    serde_json::json!({"id": "legacy-1", "type": "access", "status": "pending"})
}

#[test]
fn given_stored_request_it_cannot_decode_when_creating_then_that_request_is_kept() {
    let (store, _, storage) = clocked_storage();
    store.seed(
        REQUEST_STORAGE_KEY,
        serde_json::json!([foreign_request()]).to_string(),
    );
    let service = RequestService::new(storage);
    assert!(service.all_requests().is_empty());

    let created = service
        .create_request(RequestType::Access, "Ada", "ada@example.com", "")
        .expect("request should be created");

    let raw = store.peek(REQUEST_STORAGE_KEY).expect("array should be persisted");
    let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("stored JSON");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0], foreign_request());
    assert_eq!(service.all_requests(), vec![created]);
}

#[test]
fn given_stored_request_it_cannot_decode_when_updating_status_then_that_request_is_kept() {
    let (store, _, storage) = clocked_storage();
    let service = RequestService::new(storage);
    let request = service
        .create_request(RequestType::Erasure, "Ada", "ada@example.com", "")
        .expect("request should be created");
    let raw = store.peek(REQUEST_STORAGE_KEY).expect("array should be persisted");
    let mut stored: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("stored JSON");
    stored.insert(0, foreign_request());
    store.seed(REQUEST_STORAGE_KEY, serde_json::to_string(&stored).expect("encodes"));

    service
        .update_status(request.id, RequestStatus::InProgress)
        .expect("update should persist")
        .expect("request should exist");

    let raw = store.peek(REQUEST_STORAGE_KEY).expect("array should be persisted");
    let stored: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("stored JSON");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0], foreign_request());
    assert_eq!(stored[1]["status"], "in-progress");
}

#[test]
fn given_requests_key_holding_non_array_when_creating_then_it_is_not_overwritten() {
    let (store, _, storage) = clocked_storage();
    store.seed(REQUEST_STORAGE_KEY, "corrupted");
    let service = RequestService::new(storage);

    let err = service
        .create_request(RequestType::Access, "Ada", "ada@example.com", "")
        .expect_err("unreadable array must not be replaced");
    assert_eq!(err.kind, RequestErrorKind::Persistence);
    assert_eq!(store.peek(REQUEST_STORAGE_KEY).as_deref(), Some("corrupted"));
}

#[test]
fn given_email_without_domain_dot_when_creating_then_request_is_rejected() {
    let (_, _, storage) = clocked_storage();
    let service = RequestService::new(storage);

    let err = service
        .create_request(RequestType::Access, "Ada", "ada@localhost", "")
        .expect_err("dotless domain must fail");
    assert_eq!(err.kind, RequestErrorKind::InvalidRequest);
    assert!(service.all_requests().is_empty());
}
