use std::{fmt, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    clock::{Clock, MILLIS_PER_DAY, SystemClock},
    storage::ports::{KeyValueStore, StoreError, entry_size},
};

pub const STORAGE_TEST_KEY: &str = "__storage_test__";
pub const DEFAULT_EVICTION_MAX_AGE_DAYS: u32 = 30;

/// Envelope written by [`SafeStorage::write_with_timestamp`]. Its numeric `timestamp` makes the
/// entry eligible for quota recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedValue<T> {
    pub data: T,
    pub timestamp: i64,
}

/// Failure-absorbing JSON layer over a [`KeyValueStore`].
///
/// Reads fall back to defaults and writes report `false` instead of failing; every operation first
/// checks that the store is writable. A write rejected for quota triggers one eviction pass over
/// timestamped entries and a single retry.
#[derive(Clone)]
pub struct SafeStorage {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    eviction_max_age_days: u32,
}

impl fmt::Debug for SafeStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SafeStorage")
            .field("eviction_max_age_days", &self.eviction_max_age_days)
            .finish_non_exhaustive()
    }
}

impl SafeStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            eviction_max_age_days: DEFAULT_EVICTION_MAX_AGE_DAYS,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_eviction_max_age_days(mut self, days: u32) -> Self {
        self.eviction_max_age_days = days;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn eviction_max_age_days(&self) -> u32 {
        self.eviction_max_age_days
    }

    /// Throwaway write/delete. A store that is merely full still counts as available.
    pub fn is_available(&self) -> bool {
        match self.store.set(STORAGE_TEST_KEY, "test") {
            Ok(()) => self.store.remove(STORAGE_TEST_KEY).is_ok(),
            Err(StoreError::QuotaExceeded { .. }) => true,
            Err(_) => false,
        }
    }

    fn ensure_available(&self, operation: &'static str, key: &str) -> bool {
        if self.is_available() {
            return true;
        }
        tracing::warn!(target: "storage", operation, key = %key, "storage_unavailable");
        false
    }

    /// Stored text exactly as written, without JSON decoding.
    pub fn read_raw(&self, key: &str) -> Option<String> {
        if !self.ensure_available("read", key) {
            return None;
        }

        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(target: "storage", key = %key, error = %err, "storage_read_failed");
                None
            }
        }
    }

    /// Decoded value, or `None` when absent, unavailable or undecodable. Text that is not JSON is
    /// offered to `T` as a plain string before giving up.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key)?;
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Some(value),
            Err(parse_err) => match serde_json::from_value::<T>(Value::String(raw)) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(
                        target: "storage",
                        key = %key,
                        error = %parse_err,
                        "storage_value_malformed"
                    );
                    None
                }
            },
        }
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Elements of a stored JSON array, kept as raw values. An absent key is an empty array.
    /// `None` when the store cannot be read or holds something other than an array.
    pub fn read_json_array(&self, key: &str) -> Option<Vec<Value>> {
        if !self.ensure_available("read", key) {
            return None;
        }

        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Some(Vec::new()),
            Err(err) => {
                tracing::error!(target: "storage", key = %key, error = %err, "storage_read_failed");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => Some(items),
            Ok(_) => {
                tracing::warn!(target: "storage", key = %key, "storage_array_expected");
                None
            }
            Err(err) => {
                tracing::warn!(
                    target: "storage",
                    key = %key,
                    error = %err,
                    "storage_value_malformed"
                );
                None
            }
        }
    }

    /// Decodes each array element on its own. Elements `T` cannot read are skipped.
    pub fn read_array<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(items) = self.read_json_array(key) else {
            return Vec::new();
        };

        items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value(item) {
                Ok(value) => Some(value),
                Err(err) => {
                    tracing::warn!(
                        target: "storage",
                        key = %key,
                        index,
                        error = %err,
                        "storage_array_element_skipped"
                    );
                    None
                }
            })
            .collect()
    }

    /// Appends `item` and returns the new length. Existing elements are written back verbatim,
    /// including ones no caller can decode. Nothing is written when the stored value is not an
    /// array.
    pub fn append_to_array<T: Serialize>(&self, key: &str, item: &T) -> Option<usize> {
        let mut items = self.read_json_array(key)?;
        let item = match serde_json::to_value(item) {
            Ok(item) => item,
            Err(err) => {
                tracing::error!(
                    target: "storage",
                    key = %key,
                    error = %err,
                    "storage_serialize_failed"
                );
                return None;
            }
        };
        items.push(item);
        self.write(key, &items).then_some(items.len())
    }

    /// Strings are stored verbatim, everything else as JSON.
    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        if !self.ensure_available("write", key) {
            return false;
        }

        let serialized = match encode(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                tracing::error!(
                    target: "storage",
                    key = %key,
                    error = %err,
                    "storage_serialize_failed"
                );
                return false;
            }
        };

        match self.store.set(key, &serialized) {
            Ok(()) => true,
            Err(err) if err.is_quota_exceeded() => {
                tracing::error!(target: "storage", key = %key, error = %err, "storage_quota_exceeded");
                let evicted = self.evict_older_than(self.eviction_max_age_days);
                match self.store.set(key, &serialized) {
                    Ok(()) => {
                        tracing::info!(
                            target: "storage",
                            key = %key,
                            evicted,
                            "storage_write_recovered"
                        );
                        true
                    }
                    Err(retry_err) => {
                        tracing::error!(
                            target: "storage",
                            key = %key,
                            evicted,
                            error = %retry_err,
                            "storage_write_failed_after_eviction"
                        );
                        false
                    }
                }
            }
            Err(err) => {
                tracing::error!(target: "storage", key = %key, error = %err, "storage_write_failed");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        if !self.ensure_available("remove", key) {
            return false;
        }

        match self.store.remove(key) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(target: "storage", key = %key, error = %err, "storage_remove_failed");
                false
            }
        }
    }

    pub fn clear(&self) -> bool {
        if !self.ensure_available("clear", "*") {
            return false;
        }

        match self.store.clear() {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(target: "storage", error = %err, "storage_clear_failed");
                false
            }
        }
    }

    /// Approximate payload size: key length plus value length over every entry.
    pub fn size_bytes(&self) -> usize {
        if !self.is_available() {
            return 0;
        }

        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(err) => {
                tracing::error!(target: "storage", error = %err, "storage_size_failed");
                return 0;
            }
        };

        keys.iter()
            .filter_map(|key| match self.store.get(key) {
                Ok(Some(value)) => Some(entry_size(key, &value)),
                _ => None,
            })
            .sum()
    }

    /// Removes every entry whose JSON body carries a numeric `timestamp` older than `days`.
    /// Entries that are not JSON objects are left alone. Returns the number removed.
    pub fn evict_older_than(&self, days: u32) -> usize {
        if !self.is_available() {
            return 0;
        }

        let cutoff = self
            .clock
            .now_millis()
            .saturating_sub(i64::from(days).saturating_mul(MILLIS_PER_DAY));
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(err) => {
                tracing::error!(target: "storage", error = %err, "storage_eviction_scan_failed");
                return 0;
            }
        };

        let mut evicted = 0;
        for key in keys {
            let Ok(Some(raw)) = self.store.get(&key) else {
                continue;
            };
            let Some(timestamp) = embedded_timestamp(&raw) else {
                continue;
            };
            if timestamp >= cutoff as f64 {
                continue;
            }
            match self.store.remove(&key) {
                Ok(()) => evicted += 1,
                Err(err) => {
                    tracing::warn!(
                        target: "storage",
                        key = %key,
                        error = %err,
                        "storage_eviction_remove_failed"
                    );
                }
            }
        }

        tracing::debug!(target: "storage", days, evicted, "storage_eviction_completed");
        evicted
    }

    pub fn write_with_timestamp<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let wrapped = TimestampedValue {
            data: value,
            timestamp: self.clock.now_millis(),
        };
        self.write(key, &wrapped)
    }

    /// Unwraps a timestamped entry. An entry older than `max_age` is removed and reported absent.
    pub fn read_with_timestamp<T: DeserializeOwned>(
        &self,
        key: &str,
        max_age: Option<Duration>,
    ) -> Option<T> {
        let wrapped: TimestampedValue<T> = self.get(key)?;
        if let Some(max_age) = max_age {
            let age = self.clock.now_millis().saturating_sub(wrapped.timestamp);
            let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
            if age > max_age_ms {
                tracing::debug!(target: "storage", key = %key, age_ms = age, "storage_entry_expired");
                self.remove(key);
                return None;
            }
        }
        Some(wrapped.data)
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::String(text) => Ok(text),
        other => serde_json::to_string(&other),
    }
}

fn embedded_timestamp(raw: &str) -> Option<f64> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    parsed.as_object()?.get("timestamp")?.as_f64()
}
