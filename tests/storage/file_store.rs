use std::{fs, path::PathBuf, sync::Arc};

use ndpr_consent::storage::{FileStore, KeyValueStore, RetryPolicy, SafeStorage, StoreError};
use uuid::Uuid;

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ndpr-file-store-test-{}", Uuid::now_v7()));
    fs::create_dir_all(&dir).expect("temp dir should exist");
    dir
}

#[test]
fn given_file_store_when_reopened_then_entries_persist() {
    let dir = temp_dir();
    let path = dir.join("state").join("consent-store.json");

    let storage = SafeStorage::new(Arc::new(FileStore::new(&path)));
    assert!(storage.write("ndpr-consent", &serde_json::json!({"necessary": true})));
    assert!(storage.write("ndpr-consent-set", "true"));
    assert!(path.exists(), "store file should be created on first write");

    let reopened = SafeStorage::new(Arc::new(FileStore::new(&path)));
    assert_eq!(
        reopened.get::<serde_json::Value>("ndpr-consent"),
        Some(serde_json::json!({"necessary": true}))
    );
    assert_eq!(reopened.get::<bool>("ndpr-consent-set"), Some(true));
    assert_eq!(
        reopened.get::<String>("__storage_test__"),
        None,
        "test key must not be persisted"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_store_file_when_written_then_it_is_versioned_json() {
    let dir = temp_dir();
    let path = dir.join("store.json");
    let store = FileStore::new(&path);

    store.set("key", "value").expect("set should succeed");
    let content = fs::read_to_string(&path).expect("store file should exist");
    let parsed: serde_json::Value = serde_json::from_str(&content).expect("store is JSON");
    assert_eq!(parsed["version"], 1);
    assert_eq!(parsed["entries"]["key"], "value");
    assert!(
        !path.with_extension("tmp").exists(),
        "temp file should be renamed away"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_file_quota_when_exceeded_then_quota_error_is_reported() {
    let dir = temp_dir();
    let store = FileStore::new(dir.join("store.json")).with_quota(Some(10));

    store.set("ab", "1234").expect("6 bytes fit");
    let err = store
        .set("cd", "12345")
        .expect_err("13 bytes must exceed quota");
    assert!(err.is_quota_exceeded());
    assert_eq!(store.get("cd").expect("get should succeed"), None);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_corrupted_store_file_when_read_then_backend_error_surfaces_and_adapter_returns_default() {
    let dir = temp_dir();
    let path = dir.join("store.json");
    fs::write(&path, "{ this is not json").expect("fixture should be written");

    let store = FileStore::new(&path);
    assert!(matches!(store.get("key"), Err(StoreError::Backend(_))));

    let storage = SafeStorage::new(Arc::new(FileStore::new(&path)));
    assert!(!storage.is_available());
    assert_eq!(storage.read("key", 9), 9);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_unwritable_location_when_checked_then_store_is_unavailable() {
    let dir = temp_dir();
    let blocker = dir.join("blocker");
    fs::write(&blocker, "regular file").expect("fixture should be written");

    let store = FileStore::new(blocker.join("nested").join("store.json"))
        .with_io_retry(RetryPolicy::none());
    assert!(store.set("key", "value").is_err());

    let storage = SafeStorage::new(Arc::new(store));
    assert!(!storage.is_available());
    assert!(!storage.write("key", &1));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn given_clear_when_called_then_all_entries_are_dropped() {
    let dir = temp_dir();
    let store = FileStore::new(dir.join("store.json"));
    store.set("a", "1").expect("set should succeed");
    store.set("b", "2").expect("set should succeed");
    assert_eq!(store.keys().expect("keys"), vec!["a".to_string(), "b".to_string()]);

    store.remove("a").expect("remove should succeed");
    assert_eq!(store.keys().expect("keys"), vec!["b".to_string()]);

    store.clear().expect("clear should succeed");
    assert!(store.keys().expect("keys").is_empty());

    let _ = fs::remove_dir_all(&dir);
}
