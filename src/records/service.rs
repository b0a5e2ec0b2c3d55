use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    consent::{ConsentCategories, ConsentError, error::persistence_failed},
    records::types::{ClientContext, ConsentAction, ConsentHistoryEntry, ConsentRecord},
    storage::SafeStorage,
};

pub const CONSENT_RECORD_KEY: &str = "ndpr_consent_records";
pub const CONSENT_HISTORY_KEY: &str = "ndpr_consent_history";
pub const CONSENT_RECORD_VERSION: &str = "1.0";
pub const IP_ADDRESS_PLACEHOLDER: &str = "Collected server-side in real implementation";
pub const UNKNOWN_USER_AGENT: &str = "Unknown";

/// Audit trail of consent decisions kept next to the consent state in the same store.
#[derive(Debug, Clone)]
pub struct ConsentRecordService {
    storage: SafeStorage,
    client: ClientContext,
}

impl ConsentRecordService {
    pub fn new(storage: SafeStorage, client: ClientContext) -> Self {
        Self { storage, client }
    }

    /// Records a fresh grant, classified as `granted` regardless of history.
    pub fn save_consent(
        &self,
        consents: &ConsentCategories,
        user_id: Option<&str>,
    ) -> Result<ConsentRecord, ConsentError> {
        self.record(consents, ConsentAction::Granted, None, user_id)
    }

    /// Records a change: `granted` when nothing was recorded before, `revoked` when every
    /// category is denied, `updated` otherwise.
    pub fn update_consent(
        &self,
        consents: &ConsentCategories,
        change_reason: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<ConsentRecord, ConsentError> {
        let action = if self.current_consent().is_none() {
            ConsentAction::Granted
        } else if consents.iter().all(|(_, granted)| !granted) {
            ConsentAction::Revoked
        } else {
            ConsentAction::Updated
        };
        self.record(consents, action, change_reason, user_id)
    }

    pub fn current_consent(&self) -> Option<ConsentRecord> {
        self.storage.get(CONSENT_RECORD_KEY)
    }

    pub fn history(&self) -> Vec<ConsentHistoryEntry> {
        self.storage.read_array(CONSENT_HISTORY_KEY)
    }

    pub fn has_consent(&self, category: &str) -> bool {
        self.current_consent()
            .is_some_and(|record| record.consents.get(category) == Some(true))
    }

    /// Removes the current record and the history. True only when both removals succeeded.
    pub fn clear(&self) -> bool {
        let cleared_current = self.storage.remove(CONSENT_RECORD_KEY);
        let cleared_history = self.storage.remove(CONSENT_HISTORY_KEY);
        cleared_current && cleared_history
    }

    fn record(
        &self,
        consents: &ConsentCategories,
        action: ConsentAction,
        change_reason: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<ConsentRecord, ConsentError> {
        let timestamp = self.now();
        let user_agent = Some(
            self.client
                .user_agent
                .clone()
                .unwrap_or_else(|| UNKNOWN_USER_AGENT.to_string()),
        );

        let record = ConsentRecord {
            id: Uuid::new_v4(),
            user_id: user_id.map(str::to_string),
            consents: consents.clone(),
            timestamp,
            ip_address: Some(IP_ADDRESS_PLACEHOLDER.to_string()),
            user_agent: user_agent.clone(),
            version: CONSENT_RECORD_VERSION.to_string(),
        };
        if !self.storage.write(CONSENT_RECORD_KEY, &record) {
            return Err(persistence_failed("failed to save consent record"));
        }

        let entry = ConsentHistoryEntry {
            timestamp,
            consents: consents.clone(),
            action,
            ip_address: Some(IP_ADDRESS_PLACEHOLDER.to_string()),
            user_agent,
            version: CONSENT_RECORD_VERSION.to_string(),
            change_reason: change_reason.map(str::to_string),
        };
        let Some(history_len) = self.storage.append_to_array(CONSENT_HISTORY_KEY, &entry) else {
            return Err(persistence_failed("failed to save consent history"));
        };

        tracing::info!(
            target: "records",
            record_id = %record.id,
            action = ?action,
            history_len,
            "consent_record_saved"
        );
        Ok(record)
    }

    fn now(&self) -> OffsetDateTime {
        let nanos = i128::from(self.storage.clock().now_millis()) * 1_000_000;
        OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}
