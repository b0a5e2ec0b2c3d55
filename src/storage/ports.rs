use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded: {required} bytes required, {quota} bytes allowed")]
    QuotaExceeded { required: usize, quota: usize },
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Raw string key-value store, the equivalent of a browser's local storage area.
///
/// Implementations hold no typed data; (de)serialization and failure recovery belong to
/// [`crate::storage::SafeStorage`].
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;

    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Byte size as counted against quotas: key length plus value length.
pub fn entry_size(key: &str, value: &str) -> usize {
    key.len().saturating_add(value.len())
}
