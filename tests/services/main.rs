mod requests;

use std::sync::Arc;

use ndpr_consent::{
    clock::ManualClock,
    storage::{InMemoryStore, SafeStorage},
};

pub const EPOCH_MS: i64 = 1_767_225_600_000;

pub fn clocked_storage() -> (Arc<InMemoryStore>, Arc<ManualClock>, SafeStorage) {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(EPOCH_MS));
    let storage = SafeStorage::new(store.clone()).with_clock(clock.clone());
    (store, clock, storage)
}
