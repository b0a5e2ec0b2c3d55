use std::{fmt, sync::Arc};

use crate::{
    consent::{
        catalog::CategoryCatalog,
        error::{ConsentError, invalid_options, persistence_failed},
        ports::ConsentPort,
        types::{CategoryId, ConsentCategories, ConsentState, NECESSARY},
    },
    storage::SafeStorage,
};

pub const DEFAULT_STORAGE_KEY: &str = "ndpr-consent";

const DECIDED_FLAG_VALUE: &str = "true";

pub type ConsentChangeCallback = Box<dyn Fn(&ConsentCategories) + Send + Sync>;

/// Key of the sibling entry that marks an explicit decision.
pub fn decided_flag_key(storage_key: &str) -> String {
    format!("{storage_key}-set")
}

pub struct ConsentOptions {
    pub storage_key: String,
    pub initial_consent: ConsentCategories,
    pub on_consent_change: Option<ConsentChangeCallback>,
}

impl Default for ConsentOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            initial_consent: ConsentCategories::new(),
            on_consent_change: None,
        }
    }
}

impl fmt::Debug for ConsentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentOptions")
            .field("storage_key", &self.storage_key)
            .field("initial_consent", &self.initial_consent)
            .field("on_consent_change", &self.on_consent_change.is_some())
            .finish()
    }
}

impl ConsentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage_key(mut self, storage_key: impl Into<String>) -> Self {
        self.storage_key = storage_key.into();
        self
    }

    pub fn initial_consent(mut self, initial_consent: ConsentCategories) -> Self {
        self.initial_consent = initial_consent;
        self
    }

    pub fn on_consent_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConsentCategories) + Send + Sync + 'static,
    {
        self.on_consent_change = Some(Box::new(callback));
        self
    }
}

/// Owns one consent state machine and its persisted record.
///
/// The state starts from storage (or from defaults plus the initial overrides when nothing is
/// stored). Every decision persists the full mapping and the decided flag; live edits through
/// [`ConsentPort::update_consent`] stay in memory until the next decision.
pub struct ConsentContainer {
    storage: SafeStorage,
    catalog: Arc<CategoryCatalog>,
    storage_key: String,
    initial_consent: ConsentCategories,
    state: ConsentState,
    on_consent_change: Option<ConsentChangeCallback>,
}

impl fmt::Debug for ConsentContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentContainer")
            .field("storage_key", &self.storage_key)
            .field("catalog", &self.catalog)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ConsentContainer {
    /// Container over the four standard categories.
    pub fn new(storage: SafeStorage, options: ConsentOptions) -> Result<Self, ConsentError> {
        Self::with_catalog(storage, Arc::new(CategoryCatalog::standard()), options)
    }

    pub fn with_catalog(
        storage: SafeStorage,
        catalog: Arc<CategoryCatalog>,
        options: ConsentOptions,
    ) -> Result<Self, ConsentError> {
        let ConsentOptions {
            storage_key,
            initial_consent,
            on_consent_change,
        } = options;

        if storage_key.trim().is_empty() {
            return Err(invalid_options("storage key cannot be empty"));
        }
        catalog.validate(&initial_consent)?;

        let consent_state = load_categories(&storage, &catalog, &storage_key, &initial_consent);
        let has_user_consented = storage
            .read_raw(&decided_flag_key(&storage_key))
            .is_some_and(|flag| flag == DECIDED_FLAG_VALUE);

        tracing::debug!(
            target: "consent",
            storage_key = %storage_key,
            has_user_consented,
            categories = consent_state.len(),
            "consent_container_initialized"
        );

        Ok(Self {
            storage,
            catalog,
            storage_key,
            initial_consent,
            state: ConsentState {
                has_user_consented,
                consent_state,
                show_banner: !has_user_consented,
                show_settings: false,
            },
            on_consent_change,
        })
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn snapshot(&self) -> ConsentState {
        self.state.clone()
    }

    pub fn consent_state(&self) -> &ConsentCategories {
        &self.state.consent_state
    }

    pub fn has_user_consented(&self) -> bool {
        self.state.has_user_consented
    }

    pub fn show_banner(&self) -> bool {
        self.state.show_banner
    }

    pub fn show_settings(&self) -> bool {
        self.state.show_settings
    }

    pub fn is_granted(&self, category: &str) -> bool {
        self.state.consent_state.is_granted(category)
    }

    /// Forgets the persisted decision and returns to the undecided state with the banner shown.
    /// Returns whether both persisted entries were removed.
    pub fn reset(&mut self) -> bool {
        let removed_categories = self.storage.remove(&self.storage_key);
        let removed_flag = self.storage.remove(&decided_flag_key(&self.storage_key));

        let mut categories = self.catalog.defaults();
        for (id, granted) in self.initial_consent.iter() {
            categories.set(id.clone(), granted);
        }
        categories.set(NECESSARY, true);
        self.state = ConsentState::undecided(categories);

        tracing::info!(
            target: "consent",
            storage_key = %self.storage_key,
            removed = removed_categories && removed_flag,
            "consent_reset"
        );
        removed_categories && removed_flag
    }

    fn decide(
        &mut self,
        next: ConsentCategories,
        action: &'static str,
    ) -> Result<(), ConsentError> {
        let newly_decided = !self.state.has_user_consented;
        let changed = next != self.state.consent_state;

        self.state.consent_state = next;
        self.state.has_user_consented = true;
        self.state.show_banner = false;
        self.state.show_settings = false;

        tracing::info!(
            target: "consent",
            action,
            storage_key = %self.storage_key,
            newly_decided,
            changed,
            "consent_decision_recorded"
        );

        if changed || newly_decided {
            self.notify_change();
        }
        self.persist()
    }

    fn persist(&self) -> Result<(), ConsentError> {
        if !self
            .storage
            .write(&self.storage_key, &self.state.consent_state)
        {
            return Err(persistence_failed(format!(
                "consent preferences could not be saved under '{}'",
                self.storage_key
            )));
        }

        let flag_key = decided_flag_key(&self.storage_key);
        if !self.storage.write(&flag_key, DECIDED_FLAG_VALUE) {
            return Err(persistence_failed(format!(
                "consent decision flag could not be saved under '{flag_key}'"
            )));
        }

        Ok(())
    }

    fn notify_change(&self) {
        if !self.state.has_user_consented {
            return;
        }
        if let Some(callback) = &self.on_consent_change {
            callback(&self.state.consent_state);
        }
    }

    fn admits(&self, category: &CategoryId, action: &'static str) -> bool {
        if self.catalog.accepts(category.as_str()) {
            return true;
        }
        tracing::debug!(
            target: "consent",
            action,
            category = %category,
            "consent_unknown_category_ignored"
        );
        false
    }
}

impl ConsentPort for ConsentContainer {
    fn state(&self) -> &ConsentState {
        &self.state
    }

    fn accept_all(&mut self) -> Result<(), ConsentError> {
        let next: ConsentCategories = self
            .state
            .consent_state
            .ids()
            .map(|id| (id.clone(), true))
            .collect();
        self.decide(next, "accept_all")
    }

    fn reject_all(&mut self) -> Result<(), ConsentError> {
        let next = self
            .state
            .consent_state
            .ids()
            .map(|id| (id.clone(), id.is_necessary()))
            .collect::<ConsentCategories>()
            .with(NECESSARY, true);
        self.decide(next, "reject_all")
    }

    fn save_preferences(&mut self, preferences: &ConsentCategories) -> Result<(), ConsentError> {
        let mut next = self.state.consent_state.clone();
        for (id, granted) in preferences.iter() {
            if self.admits(id, "save_preferences") {
                next.set(id.clone(), granted);
            }
        }
        next.set(NECESSARY, true);
        self.decide(next, "save_preferences")
    }

    fn update_consent(&mut self, category: CategoryId, granted: bool) {
        if category.is_necessary() {
            tracing::debug!(target: "consent", "consent_necessary_update_ignored");
            return;
        }
        if !self.admits(&category, "update_consent") {
            return;
        }
        if self.state.consent_state.get(category.as_str()) == Some(granted) {
            return;
        }

        self.state.consent_state.set(category, granted);
        self.notify_change();
    }

    fn open_settings(&mut self) {
        self.state.show_settings = true;
        self.state.show_banner = false;
    }

    fn close_settings(&mut self) {
        self.state.show_settings = false;
    }
}

fn load_categories(
    storage: &SafeStorage,
    catalog: &CategoryCatalog,
    storage_key: &str,
    initial_consent: &ConsentCategories,
) -> ConsentCategories {
    let mut categories = catalog.defaults();

    match storage.get::<ConsentCategories>(storage_key) {
        Some(persisted) => {
            for (id, granted) in persisted.iter() {
                if catalog.accepts(id.as_str()) {
                    categories.set(id.clone(), granted);
                } else {
                    tracing::warn!(
                        target: "consent",
                        storage_key = %storage_key,
                        category = %id,
                        "consent_persisted_category_dropped"
                    );
                }
            }
        }
        None => {
            for (id, granted) in initial_consent.iter() {
                categories.set(id.clone(), granted);
            }
        }
    }

    categories.set(NECESSARY, true);
    categories
}
