//! Key-value persistence
//!
//! Each key holds one JSON array. Writes replace the whole array; there is
//! no partial update and no coordination between writers.

use super::error::StoreError;
use super::schema::init_schema;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    /// Open or create the store, creating parent directories as needed
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        tracing::debug!(path = %path.display(), "Opened key-value store");

        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Raw JSON text stored under `key`
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get_raw(key)?.is_some())
    }

    /// Parsed records under `key`; a missing key is an empty list
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.get_raw(key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Replace the whole collection under `key`
    pub fn save<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), StoreError> {
        let value = serde_json::to_string(records).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.put_raw(key, &value)?;

        tracing::debug!(key, records = records.len(), "Saved collection");
        Ok(())
    }

    /// Write raw text under `key` without validation
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            (key, value, &now),
        )?;
        Ok(())
    }

    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv_store ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    /// Delete every key, returning how many were removed
    pub fn clear(&self) -> Result<usize, StoreError> {
        Ok(self.conn.execute("DELETE FROM kv_store", [])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u64,
        label: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                id: 1,
                label: "one".into(),
            },
            Item {
                id: 2,
                label: "two".into(),
            },
        ]
    }

    #[test]
    fn test_missing_key_is_empty() {
        let store = KvStore::open_in_memory().unwrap();
        let loaded: Vec<Item> = store.get("nothing").unwrap();
        assert!(loaded.is_empty());
        assert!(!store.contains("nothing").unwrap());
    }

    #[test]
    fn test_save_replaces_whole_collection() {
        let store = KvStore::open_in_memory().unwrap();
        store.save("items", &items()).unwrap();
        store.save("items", &items()[..1]).unwrap();

        let loaded: Vec<Item> = store.get("items").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label, "one");
        assert_eq!(store.keys().unwrap(), vec!["items".to_string()]);
    }

    #[test]
    fn test_corrupt_value_reports_key() {
        let store = KvStore::open_in_memory().unwrap();
        store.put_raw("items", "{not json").unwrap();

        let err = store.get::<Item>("items").unwrap_err();
        assert!(matches!(err, StoreError::Parse { ref key, .. } if key == "items"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = KvStore::open(&path).unwrap();
            store.save("items", &items()).unwrap();
        }

        let store = KvStore::open(&path).unwrap();
        let loaded: Vec<Item> = store.get("items").unwrap();
        assert_eq!(loaded, items());
    }

    #[test]
    fn test_clear() {
        let store = KvStore::open_in_memory().unwrap();
        store.save("a", &items()).unwrap();
        store.save("b", &items()).unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.keys().unwrap().is_empty());
    }
}
