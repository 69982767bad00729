//! On-device persistence: a string key-value store holding JSON-encoded
//! collections (medicines, dose history, settings).
//!
//! Every write replaces a whole collection snapshot. There is no schema
//! versioning on the stored JSON.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{AppSettings, HistoryEntry, Medicine};

/// Record keys, shared with the mobile app's storage layout.
pub const MEDICINES_KEY: &str = "medicines";
pub const HISTORY_KEY: &str = "medicine_history";
pub const SETTINGS_KEY: &str = "app_settings";

pub const ALL_KEYS: [&str; 3] = [MEDICINES_KEY, HISTORY_KEY, SETTINGS_KEY];

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Malformed record {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal lock error")]
    LockPoisoned,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Raw string key-value backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, `None` if never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or replace the value under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove all given keys. Missing keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Typed collection access over a [`KeyValueStore`].
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get_medicines(&self) -> Result<Vec<Medicine>, StorageError> {
        self.read_json(MEDICINES_KEY).await
    }

    pub async fn save_medicines(&self, medicines: &[Medicine]) -> Result<(), StorageError> {
        self.write_json(MEDICINES_KEY, &medicines).await
    }

    pub async fn get_history(&self) -> Result<Vec<HistoryEntry>, StorageError> {
        self.read_json(HISTORY_KEY).await
    }

    pub async fn save_history(&self, history: &[HistoryEntry]) -> Result<(), StorageError> {
        self.write_json(HISTORY_KEY, &history).await
    }

    pub async fn get_settings(&self) -> Result<AppSettings, StorageError> {
        self.read_json(SETTINGS_KEY).await
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        self.write_json(SETTINGS_KEY, settings).await
    }

    /// Drop every record this app owns.
    pub async fn clear_all(&self) -> Result<(), StorageError> {
        self.store.remove(&ALL_KEYS).await?;
        tracing::info!("All stored records cleared");
        Ok(())
    }

    async fn read_json<T>(&self, key: &str) -> Result<T, StorageError>
    where
        T: DeserializeOwned + Default,
    {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            }),
            None => Ok(T::default()),
        }
    }

    async fn write_json<T>(&self, key: &str, value: &T) -> Result<(), StorageError>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Json {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &raw).await?;
        tracing::debug!(key, bytes = raw.len(), "Record saved");
        Ok(())
    }
}
