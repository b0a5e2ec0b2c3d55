pub mod bus;
pub mod manager;
pub mod types;

pub use bus::{ConsentListener, EventBus, ListenerId, Subscription};
pub use manager::{ConsentManager, diff_snapshots};
pub use types::{ConsentEvent, ConsentEventKind, UnknownEventKind};
