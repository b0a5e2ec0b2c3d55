pub mod error;
pub mod service;
pub mod types;

pub use error::{RequestError, RequestErrorKind};
pub use service::{REQUEST_STORAGE_KEY, RequestService};
pub use types::{DataSubjectRequest, RequestStatus, RequestSubject, RequestType};
