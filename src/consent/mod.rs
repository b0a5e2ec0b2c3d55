pub mod catalog;
pub mod container;
pub mod error;
pub mod factory;
pub mod ports;
pub mod types;

pub use catalog::CategoryCatalog;
pub use container::{
    ConsentChangeCallback, ConsentContainer, ConsentOptions, DEFAULT_STORAGE_KEY, decided_flag_key,
};
pub use error::{ConsentError, ConsentErrorKind};
pub use factory::ConsentFactory;
pub use ports::ConsentPort;
pub use types::{
    ANALYTICS, CategoryDeclaration, CategoryId, ConsentCategories, ConsentState, FUNCTIONAL,
    MARKETING, NECESSARY,
};
