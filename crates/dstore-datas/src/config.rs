use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use dstore_chunks::MemoryChunkStore;
use dstore_walk::DEFAULT_CONCURRENCY;

use crate::datastore::DataStore;
use crate::error::DatasError;

/// Errors from loading or applying a [`DataStoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("failed to open store: {0}")]
    Open(#[from] DatasError),
}

/// On-disk configuration for a datastore.
///
/// ```toml
/// [store]
/// name = "main"
/// backend = "memory"
///
/// [sync]
/// concurrency = 8
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataStoreConfig {
    pub store: StoreSection,
    pub sync: SyncSection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub name: String,
    pub backend: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            name: "main".into(),
            backend: "memory".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Worker count for copy operations.
    pub concurrency: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl DataStoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.name.trim().is_empty() {
            return Err(ConfigError::Invalid("store.name must not be empty".into()));
        }
        if self.sync.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "sync.concurrency must be at least 1".into(),
            ));
        }
        match self.store.backend.as_str() {
            "memory" => Ok(()),
            other => Err(ConfigError::Invalid(format!("unknown backend {other:?}"))),
        }
    }

    /// Build a local [`DataStore`] over the configured backend.
    pub fn open(&self) -> Result<DataStore, ConfigError> {
        self.validate()?;
        Ok(DataStore::new(Arc::new(MemoryChunkStore::new()))?)
    }
}
