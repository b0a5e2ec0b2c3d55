use ndpr_consent::{
    consent::{ConsentCategories, ConsentPort},
    events::ConsentEventKind,
};

use crate::{drain_kinds, record_all, standard_manager, three_category_manager};

#[test]
fn given_first_save_granting_everything_when_saved_then_exactly_one_accepted_carries_the_mapping() {
    let mut manager = three_category_manager();
    let recorded = record_all(&manager);
    let preferences = ConsentCategories::from([
        ("necessary", true),
        ("analytics", true),
        ("marketing", true),
    ]);

    manager
        .save_preferences(&preferences)
        .expect("save should persist");

    let events = recorded.lock().expect("lock poisoned").clone();
    let accepted: Vec<_> = events
        .iter()
        .filter(|event| event.kind == ConsentEventKind::ConsentAccepted)
        .collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].categories.as_ref(), Some(&preferences));
    assert!(
        events
            .iter()
            .all(|event| event.kind != ConsentEventKind::ConsentRejected)
    );
}

#[test]
fn given_first_save_with_partial_grant_when_saved_then_rejected_is_emitted() {
    let mut manager = three_category_manager();
    let recorded = record_all(&manager);

    manager
        .save_preferences(&ConsentCategories::from([
            ("analytics", false),
            ("marketing", true),
        ]))
        .expect("save should persist");

    assert_eq!(
        drain_kinds(&recorded),
        vec![
            ConsentEventKind::ConsentRejected,
            ConsentEventKind::BannerHidden
        ]
    );
}

#[test]
fn given_standard_container_when_accepting_all_then_accepted_precedes_banner_hidden() {
    let mut manager = standard_manager();
    let recorded = record_all(&manager);

    manager.accept_all().expect("accept all should persist");

    assert_eq!(
        drain_kinds(&recorded),
        vec![
            ConsentEventKind::ConsentAccepted,
            ConsentEventKind::BannerHidden
        ]
    );
}

#[test]
fn given_open_settings_when_rejecting_all_then_rejected_precedes_settings_closed() {
    let mut manager = standard_manager();
    let recorded = record_all(&manager);

    manager.open_settings();
    assert_eq!(
        drain_kinds(&recorded),
        vec![
            ConsentEventKind::BannerHidden,
            ConsentEventKind::SettingsOpened
        ]
    );

    manager.reject_all().expect("reject all should persist");
    assert_eq!(
        drain_kinds(&recorded),
        vec![
            ConsentEventKind::ConsentRejected,
            ConsentEventKind::SettingsClosed
        ]
    );
}

#[test]
fn given_decided_state_when_mapping_changes_then_updated_is_emitted() {
    let mut manager = standard_manager();
    let recorded = record_all(&manager);
    manager.reject_all().expect("reject all should persist");
    drain_kinds(&recorded);

    manager.update_consent("analytics".into(), true);
    assert_eq!(drain_kinds(&recorded), vec![ConsentEventKind::ConsentUpdated]);

    manager
        .save_preferences(&ConsentCategories::from([("marketing", true)]))
        .expect("save should persist");
    assert_eq!(drain_kinds(&recorded), vec![ConsentEventKind::ConsentUpdated]);

    manager
        .save_preferences(&ConsentCategories::from([("marketing", true)]))
        .expect("save should persist");
    assert!(drain_kinds(&recorded).is_empty(), "unchanged mapping is silent");
}

#[test]
fn given_undecided_state_when_updating_a_category_then_nothing_is_emitted() {
    let mut manager = standard_manager();
    let recorded = record_all(&manager);

    manager.update_consent("analytics".into(), true);
    manager.close_settings();

    assert!(drain_kinds(&recorded).is_empty());
}

#[test]
fn given_decided_container_when_reset_through_manager_then_banner_shown_is_emitted() {
    let mut manager = standard_manager();
    manager.accept_all().expect("accept all should persist");
    let recorded = record_all(&manager);

    let cleared = manager.with_inner_mut(|container| container.reset());

    assert!(cleared);
    assert_eq!(drain_kinds(&recorded), vec![ConsentEventKind::BannerShown]);
    assert!(!manager.state().has_user_consented);
}

#[test]
fn given_failed_persistence_when_deciding_then_events_still_reflect_the_transition() {
    use std::sync::Arc;

    use ndpr_consent::{
        consent::{ConsentContainer, ConsentOptions},
        events::ConsentManager,
        storage::{InMemoryStore, SafeStorage},
    };

    let storage = SafeStorage::new(Arc::new(InMemoryStore::unavailable()));
    let container =
        ConsentContainer::new(storage, ConsentOptions::new()).expect("container should build");
    let mut manager = ConsentManager::new(container);
    let recorded = record_all(&manager);

    assert!(manager.accept_all().is_err());
    assert_eq!(
        drain_kinds(&recorded),
        vec![
            ConsentEventKind::ConsentAccepted,
            ConsentEventKind::BannerHidden
        ]
    );
}
