use std::{collections::BTreeMap, sync::RwLock};

use crate::storage::ports::{KeyValueStore, StoreError, entry_size};

#[derive(Debug)]
struct MemoryState {
    entries: BTreeMap<String, String>,
    available: bool,
    quota_bytes: Option<usize>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            available: true,
            quota_bytes: None,
        }
    }
}

/// Process-local store with an optional byte quota and an availability switch that mimics
/// disabled or private-browsing storage.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        let store = Self::default();
        store.set_quota(Some(quota_bytes));
        store
    }

    pub fn unavailable() -> Self {
        let store = Self::default();
        store.set_available(false);
        store
    }

    pub fn set_available(&self, available: bool) {
        self.state.write().expect("lock poisoned").available = available;
    }

    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        self.state.write().expect("lock poisoned").quota_bytes = quota_bytes;
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts without quota or availability checks, for seeding fixtures.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.state
            .write()
            .expect("lock poisoned")
            .entries
            .insert(key.into(), value.into());
    }

    /// Reads without availability checks, for asserting on fixtures.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.state
            .read()
            .expect("lock poisoned")
            .entries
            .get(key)
            .cloned()
    }
}

fn ensure_available(state: &MemoryState) -> Result<(), StoreError> {
    if state.available {
        Ok(())
    } else {
        Err(StoreError::Unavailable(
            "in-memory store is disabled".to_string(),
        ))
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.state.read().expect("lock poisoned");
        ensure_available(&guard)?;
        Ok(guard.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.state.write().expect("lock poisoned");
        ensure_available(&guard)?;

        if let Some(quota) = guard.quota_bytes {
            let current: usize = guard
                .entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, stored)| entry_size(existing, stored))
                .sum();
            let required = current.saturating_add(entry_size(key, value));
            if required > quota {
                return Err(StoreError::QuotaExceeded { required, quota });
            }
        }

        guard.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut guard = self.state.write().expect("lock poisoned");
        ensure_available(&guard)?;
        guard.entries.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.state.write().expect("lock poisoned");
        ensure_available(&guard)?;
        guard.entries.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let guard = self.state.read().expect("lock poisoned");
        ensure_available(&guard)?;
        Ok(guard.entries.keys().cloned().collect())
    }
}
