use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    consent::{
        CategoryDeclaration, ConsentCategories, ConsentContainer, ConsentError, ConsentFactory,
        ConsentOptions, DEFAULT_STORAGE_KEY,
    },
    records::ClientContext,
    storage::{
        DEFAULT_EVICTION_MAX_AGE_DAYS, FileStore, InMemoryStore, KeyValueStore, RetryPolicy,
        SafeStorage,
    },
};

pub const SCHEMA_FILE_NAME: &str = "ndpr-consent.schema.json";

const EMBEDDED_SCHEMA: &str = include_str!("../ndpr-consent.schema.json");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub consent: ConsentConfig,
    #[serde(default)]
    pub client: ClientContext,
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/consent")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_enabled_true() -> bool {
    true
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./state/consent-store.json")
}

fn default_eviction_max_age_days() -> u32 {
    DEFAULT_EVICTION_MAX_AGE_DAYS
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackendKind {
    Memory,
    File,
}

fn default_storage_backend() -> StorageBackendKind {
    StorageBackendKind::File
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackendKind,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub quota_bytes: Option<usize>,
    #[serde(default = "default_eviction_max_age_days")]
    pub eviction_max_age_days: u32,
    #[serde(default)]
    pub io_retry: RetryPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_storage_path(),
            quota_bytes: None,
            eviction_max_age_days: default_eviction_max_age_days(),
            io_retry: RetryPolicy::default(),
        }
    }
}

impl StorageConfig {
    pub fn open(&self) -> SafeStorage {
        let store: Arc<dyn KeyValueStore> = match self.backend {
            StorageBackendKind::Memory => {
                let store = InMemoryStore::new();
                store.set_quota(self.quota_bytes);
                Arc::new(store)
            }
            StorageBackendKind::File => Arc::new(
                FileStore::new(&self.path)
                    .with_quota(self.quota_bytes)
                    .with_io_retry(self.io_retry.clone()),
            ),
        };
        SafeStorage::new(store).with_eviction_max_age_days(self.eviction_max_age_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default)]
    pub initial_consent: ConsentCategories,
    /// Presence switches from the four standard categories to a declared catalog.
    #[serde(default)]
    pub categories: Option<Vec<CategoryDeclaration>>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            initial_consent: ConsentCategories::new(),
            categories: None,
        }
    }
}

impl ConsentConfig {
    pub fn factory(&self) -> Result<ConsentFactory, ConsentError> {
        match &self.categories {
            Some(declarations) => ConsentFactory::new(declarations.clone()),
            None => Ok(ConsentFactory::standard()),
        }
    }

    pub fn options(&self) -> ConsentOptions {
        ConsentOptions::new()
            .storage_key(self.storage_key.clone())
            .initial_consent(self.initial_consent.clone())
    }

    pub fn build_container(&self, storage: SafeStorage) -> Result<ConsentContainer, ConsentError> {
        self.factory()?.create(storage, self.options())
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema = load_schema(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize consent config")?;

        if !config.storage.path.is_absolute() {
            config.storage.path = config_base.join(&config.storage.path);
        }

        Ok(config)
    }
}

/// Schema named by `$schema`, else one next to the config file, else the schema built into the
/// binary.
fn load_schema(config_base: &Path, config_value: &Value) -> Result<Value> {
    let schema_path = match config_value.get("$schema").and_then(|value| value.as_str()) {
        Some(path_text) => {
            let configured = PathBuf::from(path_text);
            Some(if configured.is_absolute() {
                configured
            } else {
                config_base.join(&configured)
            })
        }
        None => Some(config_base.join(SCHEMA_FILE_NAME)).filter(|path| path.exists()),
    };

    let Some(schema_path) = schema_path else {
        return serde_json::from_str(EMBEDDED_SCHEMA).context("failed to parse embedded schema");
    };

    let schema_content = fs::read_to_string(&schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))
}

fn validate_against_schema(config_value: &Value, schema: &Value) -> Result<()> {
    let compiled =
        JSONSchema::compile(schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
