pub mod service;
pub mod types;

pub use service::{
    CONSENT_HISTORY_KEY, CONSENT_RECORD_KEY, CONSENT_RECORD_VERSION, ConsentRecordService,
    IP_ADDRESS_PLACEHOLDER, UNKNOWN_USER_AGENT,
};
pub use types::{ClientContext, ConsentAction, ConsentHistoryEntry, ConsentRecord};
