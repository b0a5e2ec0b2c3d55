use ndpr_consent::consent::{
    CategoryDeclaration, ConsentCategories, ConsentErrorKind, ConsentFactory, ConsentOptions,
    ConsentPort,
};

use crate::memory_storage;

fn cookie_factory() -> ConsentFactory {
    ConsentFactory::new(vec![
        CategoryDeclaration::new("necessary", "Necessary").required(),
        CategoryDeclaration::new("preferences", "Preferences"),
        CategoryDeclaration::new("statistics", "Statistics").with_description("Usage statistics"),
        CategoryDeclaration::new("personalization", "Personalization").required(),
    ])
    .expect("declarations are valid")
}

#[test]
fn given_declared_categories_when_created_then_defaults_follow_the_declarations() {
    let (_, storage) = memory_storage();
    let container = cookie_factory()
        .create(storage, ConsentOptions::new())
        .expect("container should build");

    assert_eq!(
        container.consent_state(),
        &ConsentCategories::from([
            ("necessary", true),
            ("preferences", false),
            ("statistics", false),
            ("personalization", false),
        ])
    );
    assert!(container.catalog().is_closed());
    assert!(!container.has_user_consented());
}

#[test]
fn given_declarations_without_necessary_when_created_then_necessary_is_still_seeded() {
    let (_, storage) = memory_storage();
    let factory = ConsentFactory::new(vec![CategoryDeclaration::new("ads", "Ads")])
        .expect("declarations are valid");
    let container = factory
        .create(storage, ConsentOptions::new())
        .expect("container should build");

    assert!(container.is_granted("necessary"));
    assert_eq!(container.consent_state().len(), 2);
}

#[test]
fn given_declared_categories_when_accepting_all_then_exactly_the_declared_ids_are_granted() {
    let (_, storage) = memory_storage();
    let mut container = cookie_factory()
        .create(storage, ConsentOptions::new())
        .expect("container should build");

    container.accept_all().expect("accept all should persist");

    assert_eq!(
        container.consent_state(),
        &ConsentCategories::from([
            ("necessary", true),
            ("preferences", true),
            ("statistics", true),
            ("personalization", true),
        ])
    );
}

#[test]
fn given_required_flag_when_rejecting_all_then_only_necessary_survives() {
    let (_, storage) = memory_storage();
    let mut container = cookie_factory()
        .create(storage, ConsentOptions::new())
        .expect("container should build");

    container.accept_all().expect("accept all should persist");
    container.reject_all().expect("reject all should persist");

    assert!(container.is_granted("necessary"));
    assert!(
        !container.is_granted("personalization"),
        "required declarations are not exempt from reject all"
    );
    assert!(!container.is_granted("preferences"));
}

#[test]
fn given_unknown_ids_when_acting_then_they_are_ignored() {
    let (store, storage) = memory_storage();
    let mut container = cookie_factory()
        .create(storage, ConsentOptions::new())
        .expect("container should build");

    container.update_consent("tracking".into(), true);
    assert!(!container.consent_state().contains("tracking"));

    container
        .save_preferences(&ConsentCategories::from([
            ("tracking", true),
            ("statistics", true),
        ]))
        .expect("save should persist");
    assert!(!container.consent_state().contains("tracking"));
    assert!(container.is_granted("statistics"));

    let persisted = store.peek("ndpr-consent").expect("mapping should be persisted");
    assert!(!persisted.contains("tracking"));
}

#[test]
fn given_unknown_initial_override_when_created_then_construction_fails() {
    let (_, storage) = memory_storage();
    let err = cookie_factory()
        .create(
            storage,
            ConsentOptions::new().initial_consent(ConsentCategories::from([("tracking", true)])),
        )
        .expect_err("unknown override must fail");
    assert_eq!(err.kind, ConsentErrorKind::UnknownCategory);
}

#[test]
fn given_unknown_persisted_keys_when_loaded_then_they_are_dropped() {
    let (store, storage) = memory_storage();
    store.seed(
        "site-consent",
        r#"{"necessary":true,"statistics":true,"legacy":true}"#,
    );
    store.seed("site-consent-set", "true");

    let container = cookie_factory()
        .create(storage, ConsentOptions::new().storage_key("site-consent"))
        .expect("container should build");

    assert!(container.has_user_consented());
    assert!(container.is_granted("statistics"));
    assert!(!container.consent_state().contains("legacy"));
    assert_eq!(container.consent_state().len(), 4);
}

#[test]
fn given_one_factory_when_creating_twice_then_containers_are_isolated() {
    let (_, storage) = memory_storage();
    let factory = cookie_factory();
    let mut first = factory
        .create(storage.clone(), ConsentOptions::new().storage_key("first"))
        .expect("container should build");
    let second = factory
        .create(storage, ConsentOptions::new().storage_key("second"))
        .expect("container should build");

    first.accept_all().expect("accept all should persist");

    assert!(first.is_granted("statistics"));
    assert!(!second.is_granted("statistics"));
    assert!(!second.has_user_consented());
}

#[test]
fn given_invalid_declarations_when_building_factory_then_catalog_error_is_returned() {
    for declarations in [
        vec![],
        vec![
            CategoryDeclaration::new("ads", "Ads"),
            CategoryDeclaration::new("ads", "Ads"),
        ],
        vec![CategoryDeclaration::new(" ads", "Ads")],
    ] {
        let err = ConsentFactory::new(declarations).expect_err("declarations must be rejected");
        assert_eq!(err.kind, ConsentErrorKind::InvalidCatalog);
    }
}

#[test]
fn given_standard_factory_when_created_then_it_matches_the_default_container() {
    let (_, storage) = memory_storage();
    let container = ConsentFactory::standard()
        .create(storage, ConsentOptions::new())
        .expect("container should build");

    assert!(!container.catalog().is_closed());
    assert_eq!(container.consent_state().len(), 4);
}
