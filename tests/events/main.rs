mod manager;

use std::sync::{Arc, Mutex};

use ndpr_consent::{
    consent::{CategoryDeclaration, ConsentContainer, ConsentFactory, ConsentOptions},
    events::{ConsentEvent, ConsentEventKind, ConsentManager},
    storage::{InMemoryStore, SafeStorage},
};

pub type Recorded = Arc<Mutex<Vec<ConsentEvent>>>;

pub fn standard_manager() -> ConsentManager {
    let storage = SafeStorage::new(Arc::new(InMemoryStore::new()));
    let container =
        ConsentContainer::new(storage, ConsentOptions::new()).expect("container should build");
    ConsentManager::new(container)
}

/// Manager over exactly `necessary`, `analytics` and `marketing`.
pub fn three_category_manager() -> ConsentManager {
    let storage = SafeStorage::new(Arc::new(InMemoryStore::new()));
    let container = ConsentFactory::new(vec![
        CategoryDeclaration::new("necessary", "Necessary").required(),
        CategoryDeclaration::new("analytics", "Analytics"),
        CategoryDeclaration::new("marketing", "Marketing"),
    ])
    .expect("declarations are valid")
    .create(storage, ConsentOptions::new())
    .expect("container should build");
    ConsentManager::new(container)
}

/// Records every event of every kind, in emission order.
pub fn record_all(manager: &ConsentManager) -> Recorded {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    for kind in ConsentEventKind::ALL {
        let sink = Arc::clone(&recorded);
        manager.on(kind, move |event| {
            sink.lock().expect("lock poisoned").push(event.clone());
        });
    }
    recorded
}

pub fn drain_kinds(recorded: &Recorded) -> Vec<ConsentEventKind> {
    recorded
        .lock()
        .expect("lock poisoned")
        .drain(..)
        .map(|event| event.kind)
        .collect()
}
