//! Key-value persistence for rollcall.
//!
//! Everything the tool remembers between runs (attendance ledgers, scan
//! hand-offs, request queues, the login session) is a string value under a
//! string key. [`SqliteStore`] keeps them in a local database;
//! [`MemoryStore`] keeps them in process for tests and dry runs.

pub mod envelope;
pub mod keys;
pub mod migrations;
pub mod schema;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use envelope::{load, save};
pub use keys::{KeyKind, SessionScope, StorageKey, AUTH_SESSION_KEY};

/// A string-keyed, string-valued store.
pub trait KvStore: std::fmt::Debug {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// `SQLite`-backed store.
#[derive(Debug)]
pub struct SqliteStore {
    path: PathBuf,
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a store at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created, or
    /// the schema cannot be initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        migrations::initialize_schema(&conn)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")?;
        let keys = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries.lock().map_err(|_| Error::StorePoisoned)
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries()?.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("class_1_autoScanned").unwrap(), None);

        store.set("class_1_autoScanned", "true").unwrap();
        store.set("class_1_attendance", "[]").unwrap();
        store.set("class_11_attendance", "[]").unwrap();
        assert_eq!(
            store.get("class_1_autoScanned").unwrap().as_deref(),
            Some("true")
        );

        store.set("class_1_autoScanned", "false").unwrap();
        assert_eq!(
            store.get("class_1_autoScanned").unwrap().as_deref(),
            Some("false")
        );

        assert_eq!(
            store.keys_with_prefix("class_1_").unwrap(),
            vec!["class_1_attendance", "class_1_autoScanned"]
        );

        assert!(store.remove("class_1_autoScanned").unwrap());
        assert!(!store.remove("class_1_autoScanned").unwrap());
        assert_eq!(store.get("class_1_autoScanned").unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_sqlite_store_in_memory() {
        let store = SqliteStore::open_in_memory().unwrap();
        exercise(&store);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.path(), Path::new(":memory:"));
    }

    #[test]
    fn test_sqlite_prefix_is_literal() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("class_1_x", "a").unwrap();
        store.set("classX1_x", "b").unwrap();
        assert_eq!(store.keys_with_prefix("class_1").unwrap(), vec!["class_1_x"]);
    }

    #[test]
    fn test_sqlite_store_persists_across_opens() {
        let dir = std::env::temp_dir().join(format!("rollcall-test-{}", std::process::id()));
        let path = dir.join("nested").join("rollcall.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("auth_session", "x").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("auth_session").unwrap().as_deref(), Some("x"));

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
