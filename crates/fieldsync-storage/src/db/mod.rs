//! SQLite-backed implementation of the local store.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StorageError};
use crate::migrations;
use crate::store::{KeyValueStore, Partition};

/// Local store persisted in a single SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `db_path`, defaulting to the platform data directory
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation, connection opening, or schema initialization fails
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        let path = db_path.unwrap_or_else(Self::default_db_path);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        migrations::enable_wal(&conn)?;
        migrations::init_schema(&conn)?;

        log::info!("Local store opened at: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a store that lives only as long as this value
    ///
    /// # Errors
    ///
    /// Returns an error if schema initialization fails
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the store at an explicit path
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened
    pub fn open_at(path: &Path) -> Result<Self> {
        Self::open(Some(path.to_path_buf()))
    }

    /// Get default database path
    #[must_use]
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("fieldsync");
        path.push("fieldsync.db");
        path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn put(&self, partition: Partition, id: &str, value: &[u8]) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO records (partition, id, body, stored_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(partition, id) DO UPDATE SET
                body = excluded.body,
                stored_at = excluded.stored_at",
            params![partition.as_str(), id, value, Utc::now().to_rfc3339()],
        )?;
        log::debug!("Stored {partition}/{id} ({} bytes)", value.len());
        Ok(())
    }

    async fn get(&self, partition: Partition, id: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        let body = conn
            .query_row(
                "SELECT body FROM records WHERE partition = ?1 AND id = ?2",
                params![partition.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<(String, Vec<u8>)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, body FROM records WHERE partition = ?1")?;

        let rows = stmt
            .query_map(params![partition.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    async fn delete(&self, partition: Partition, id: &str) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM records WHERE partition = ?1 AND id = ?2",
            params![partition.as_str(), id],
        )?;
        if deleted > 0 {
            log::debug!("Deleted {partition}/{id}");
        }
        Ok(())
    }

    async fn count(&self, partition: Partition) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM records WHERE partition = ?1",
            params![partition.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put(Partition::TimeEntries, "a", b"one").await.unwrap();

        let value = store.get(Partition::TimeEntries, "a").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"one"[..]));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get(Partition::Expenses, "nope").await.unwrap().is_none());
        assert!(store.get_all(Partition::Expenses).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_is_upsert() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put(Partition::TimeEntries, "a", b"one").await.unwrap();
        store.put(Partition::TimeEntries, "a", b"two").await.unwrap();

        assert_eq!(store.count(Partition::TimeEntries).await.unwrap(), 1);
        let value = store.get(Partition::TimeEntries, "a").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"two"[..]));
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.delete(Partition::PendingPhotos, "ghost").await.unwrap();

        store.put(Partition::PendingPhotos, "p1", b"x").await.unwrap();
        store.delete(Partition::PendingPhotos, "p1").await.unwrap();
        store.delete(Partition::PendingPhotos, "p1").await.unwrap();
        assert_eq!(store.count(Partition::PendingPhotos).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put(Partition::TimeEntries, "same", b"t").await.unwrap();
        store.put(Partition::Expenses, "same", b"e").await.unwrap();

        store.delete(Partition::TimeEntries, "same").await.unwrap();

        assert!(store.get(Partition::TimeEntries, "same").await.unwrap().is_none());
        let all = store.get_all(Partition::Expenses).await.unwrap();
        assert_eq!(all, vec![("same".to_string(), b"e".to_vec())]);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = SqliteStore::open_at(&path).unwrap();
            store.put(Partition::DailyLogs, "log-1", b"notes").await.unwrap();
        }

        let reopened = SqliteStore::open_at(&path).unwrap();
        let value = reopened.get(Partition::DailyLogs, "log-1").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"notes"[..]));
    }
}
