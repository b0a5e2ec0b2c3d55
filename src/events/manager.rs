use crate::{
    consent::{
        CategoryId, ConsentCategories, ConsentContainer, ConsentError, ConsentPort, ConsentState,
    },
    events::{
        bus::{EventBus, Subscription},
        types::{ConsentEvent, ConsentEventKind},
    },
};

/// Consent port that reports its own transitions as [`ConsentEvent`]s.
///
/// Every action is forwarded to the wrapped port; afterwards the new snapshot is diffed against the
/// previous one and the resulting events are published on the bus.
#[derive(Debug)]
pub struct ConsentManager<P = ConsentContainer> {
    inner: P,
    bus: EventBus,
    previous: ConsentState,
}

impl<P: ConsentPort> ConsentManager<P> {
    pub fn new(inner: P) -> Self {
        Self::with_bus(inner, EventBus::new())
    }

    pub fn with_bus(inner: P, bus: EventBus) -> Self {
        let previous = inner.state().clone();
        Self {
            inner,
            bus,
            previous,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Runs `mutate` against the wrapped port, then publishes whatever it changed.
    pub fn with_inner_mut<R>(&mut self, mutate: impl FnOnce(&mut P) -> R) -> R {
        let result = mutate(&mut self.inner);
        self.observe();
        result
    }

    pub fn on<F>(&self, kind: ConsentEventKind, listener: F) -> Subscription
    where
        F: Fn(&ConsentEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, listener)
    }

    pub fn off(&self, subscription: &Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    pub fn emit(&self, kind: ConsentEventKind, categories: Option<ConsentCategories>) -> usize {
        self.bus.publish(&ConsentEvent { kind, categories })
    }

    fn observe(&mut self) {
        let current = self.inner.state().clone();
        for event in diff_snapshots(&self.previous, &current) {
            self.bus.publish(&event);
        }
        self.previous = current;
    }
}

impl<P: ConsentPort> ConsentPort for ConsentManager<P> {
    fn state(&self) -> &ConsentState {
        self.inner.state()
    }

    fn accept_all(&mut self) -> Result<(), ConsentError> {
        let result = self.inner.accept_all();
        self.observe();
        result
    }

    fn reject_all(&mut self) -> Result<(), ConsentError> {
        let result = self.inner.reject_all();
        self.observe();
        result
    }

    fn save_preferences(&mut self, preferences: &ConsentCategories) -> Result<(), ConsentError> {
        let result = self.inner.save_preferences(preferences);
        self.observe();
        result
    }

    fn update_consent(&mut self, category: CategoryId, granted: bool) {
        self.inner.update_consent(category, granted);
        self.observe();
    }

    fn open_settings(&mut self) {
        self.inner.open_settings();
        self.observe();
    }

    fn close_settings(&mut self) {
        self.inner.close_settings();
        self.observe();
    }
}

/// Events implied by moving from `previous` to `current`, in emission order: the consent
/// classification, then the banner transition, then the settings transition.
///
/// A first decision is `accepted` only when every non-necessary category is granted; any partial
/// grant is reported as `rejected`.
pub fn diff_snapshots(previous: &ConsentState, current: &ConsentState) -> Vec<ConsentEvent> {
    let mut events = Vec::new();

    if !previous.has_user_consented && current.has_user_consented {
        let kind = if current.consent_state.all_optional_granted() {
            ConsentEventKind::ConsentAccepted
        } else {
            ConsentEventKind::ConsentRejected
        };
        events.push(ConsentEvent::with_categories(
            kind,
            current.consent_state.clone(),
        ));
    } else if previous.has_user_consented
        && current.has_user_consented
        && previous.consent_state != current.consent_state
    {
        events.push(ConsentEvent::with_categories(
            ConsentEventKind::ConsentUpdated,
            current.consent_state.clone(),
        ));
    }

    match (previous.show_banner, current.show_banner) {
        (false, true) => events.push(ConsentEvent::new(ConsentEventKind::BannerShown)),
        (true, false) => events.push(ConsentEvent::new(ConsentEventKind::BannerHidden)),
        _ => {}
    }

    match (previous.show_settings, current.show_settings) {
        (false, true) => events.push(ConsentEvent::new(ConsentEventKind::SettingsOpened)),
        (true, false) => events.push(ConsentEvent::new(ConsentEventKind::SettingsClosed)),
        _ => {}
    }

    events
}
