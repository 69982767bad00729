use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::{KeyValueStore, StorageError};

/// Key-value store backed by a single SQLite table.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the store file at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::from_connection(Connection::open(path)?)?;
        tracing::info!(
            path = %path.display(),
            keys = store.count_keys()?,
            "Opened key-value store"
        );
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        configure_pragmas(&conn)?;
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored keys.
    pub fn count_keys(&self) -> Result<i64, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let count = conn.query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn configure_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
    Ok(())
}

fn ensure_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        match stmt.query_row([key], |row| row.get::<_, String>(0)) {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        let tx = conn.transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get("medicines").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("medicines", "[]").await.unwrap();
        store.set("medicines", "[1]").await.unwrap();
        assert_eq!(store.get("medicines").await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.count_keys().unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_listed_keys_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.remove(&["a", "zzz"]).await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("app_settings", r#"{"language":"en"}"#).await.unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("app_settings").await.unwrap().as_deref(),
            Some(r#"{"language":"en"}"#)
        );
    }
}
