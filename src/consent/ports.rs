use crate::consent::{
    error::ConsentError,
    types::{CategoryId, ConsentCategories, ConsentState},
};

/// The surface presentation components drive: the current state plus the six consent actions.
///
/// Decisions (`accept_all`, `reject_all`, `save_preferences`) persist and report storage failures;
/// the remaining actions only touch in-memory state.
pub trait ConsentPort {
    fn state(&self) -> &ConsentState;

    fn accept_all(&mut self) -> Result<(), ConsentError>;

    fn reject_all(&mut self) -> Result<(), ConsentError>;

    fn save_preferences(&mut self, preferences: &ConsentCategories) -> Result<(), ConsentError>;

    fn update_consent(&mut self, category: CategoryId, granted: bool);

    fn open_settings(&mut self);

    fn close_settings(&mut self);
}
