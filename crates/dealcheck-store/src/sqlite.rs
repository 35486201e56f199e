use crate::{KeyValueStore, Result, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Durable key-value store on SQLite
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Survives restarts without us writing a file format
/// - Doesn't require a separate process
///
/// The connection sits behind a mutex since rusqlite connections aren't `Sync`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        debug!("Opened key-value store at {}", db_path.display());

        // Initialize schema on first run
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Throwaway database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite connection lock poisoned".into()))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "[1,2,3]").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("[1,2,3]".to_string()));

        store.set("k", "[]").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("[]".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("dealcheck_saved_products", "[]").unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get("dealcheck_saved_products").unwrap(),
            Some("[]".to_string())
        );
    }
}
