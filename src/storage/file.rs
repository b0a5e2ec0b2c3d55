use std::{
    collections::BTreeMap,
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::storage::{
    ports::{KeyValueStore, StoreError, entry_size},
    retry::{RetryPolicy, with_retry},
};

const STORE_FILE_VERSION: u64 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedStore {
    version: u64,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Key-value store kept as one JSON document on disk.
///
/// Every operation re-reads the file, so several handles (or processes) see each other's writes;
/// concurrent writers are not reconciled and the last rename wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    quota_bytes: Option<usize>,
    io_retry: RetryPolicy,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: None,
            io_retry: RetryPolicy::default(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn with_io_retry(mut self, io_retry: RetryPolicy) -> Self {
        self.io_retry = io_retry;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(err) => {
                return Err(StoreError::Backend(format!(
                    "failed to read store '{}': {err}",
                    self.path.display()
                )));
            }
        };

        let parsed: PersistedStore = serde_json::from_str(&content).map_err(|err| {
            StoreError::Backend(format!(
                "failed to parse store '{}': {err}",
                self.path.display()
            ))
        })?;
        if parsed.version != STORE_FILE_VERSION {
            return Err(StoreError::Backend(format!(
                "unsupported store version {} at '{}'",
                parsed.version,
                self.path.display()
            )));
        }

        Ok(parsed.entries)
    }

    fn save(&self, entries: BTreeMap<String, String>) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|err| {
            StoreError::Unavailable(format!(
                "failed to create store directory '{}': {err}",
                parent.display()
            ))
        })?;

        let persisted = PersistedStore {
            version: STORE_FILE_VERSION,
            entries,
        };
        let tmp_path = self.path.with_extension("tmp");

        with_retry(&self.io_retry, || self.write_and_replace(&persisted, &tmp_path))
    }

    fn write_and_replace(
        &self,
        persisted: &PersistedStore,
        tmp_path: &Path,
    ) -> Result<(), StoreError> {
        let file = fs::File::create(tmp_path).map_err(|err| {
            StoreError::Backend(format!(
                "failed to create store temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, persisted).map_err(|err| {
                StoreError::Backend(format!(
                    "failed to serialize store '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").and_then(|_| writer.flush()).map_err(|err| {
                StoreError::Backend(format!(
                    "failed to flush store '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }
        file.sync_all().map_err(|err| {
            StoreError::Backend(format!(
                "failed to sync store temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(tmp_path, &self.path).map_err(|err| {
            StoreError::Backend(format!(
                "failed to replace store '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })
    }

    fn check_quota(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let Some(quota) = self.quota_bytes else {
            return Ok(());
        };
        let required: usize = entries
            .iter()
            .map(|(key, value)| entry_size(key, value))
            .sum();
        if required > quota {
            return Err(StoreError::QuotaExceeded { required, quota });
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("lock poisoned");
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.check_quota(&entries)?;
        self.save(entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("lock poisoned");
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.save(entries)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("lock poisoned");
        self.save(BTreeMap::new())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.load()?.into_keys().collect())
    }
}
