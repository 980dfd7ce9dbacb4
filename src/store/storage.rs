//! Storage trait and SQLite implementation.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{FetchError, Result};

/// Namespaced text store backing both the response cache and the offline queue.
pub trait Storage: Send + Sync {
  /// Read the text stored under `key`, if any.
  fn read_text(&self, namespace: &str, key: &str) -> Result<Option<String>>;

  /// Store `text` under `key`, replacing any previous value.
  fn write_text(&self, namespace: &str, key: &str, text: &str) -> Result<()>;

  /// Delete one key. Returns whether it existed.
  fn delete(&self, namespace: &str, key: &str) -> Result<bool>;

  /// Keys in `namespace` starting with `prefix`, in key order.
  fn keys(&self, namespace: &str, prefix: &str) -> Result<Vec<String>>;

  /// Delete every key in `namespace`. Returns how many were removed.
  fn clear(&self, namespace: &str) -> Result<usize>;
}

fn storage_err(context: &str, e: impl std::fmt::Display) -> FetchError {
  FetchError::Storage(format!("{}: {}", context, e))
}

/// SQLite-based storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open or create the store at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| storage_err("Failed to create store directory", e))?;
    }

    let conn = Connection::open(path).map_err(|e| {
      storage_err(
        &format!("Failed to open store database at {}", path.display()),
        e,
      )
    })?;

    Self::from_connection(conn)
  }

  /// Private in-memory database, gone when dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| storage_err("Failed to open in-memory database", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// `<data_dir>/rfetch/store.db`
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| FetchError::Storage("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("rfetch").join("store.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| storage_err("Failed to run store migrations", e))?;
    Ok(())
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| FetchError::Storage(format!("Lock poisoned: {}", e)))
  }
}

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    namespace TEXT NOT NULL,
    entry_key TEXT NOT NULL,
    body TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (namespace, entry_key)
);
"#;

impl Storage for SqliteStorage {
  fn read_text(&self, namespace: &str, key: &str) -> Result<Option<String>> {
    let conn = self.lock()?;
    conn
      .query_row(
        "SELECT body FROM entries WHERE namespace = ? AND entry_key = ?",
        params![namespace, key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| storage_err("Failed to read entry", e))
  }

  fn write_text(&self, namespace: &str, key: &str, text: &str) -> Result<()> {
    let conn = self.lock()?;
    conn
      .execute(
        "INSERT OR REPLACE INTO entries (namespace, entry_key, body, written_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![namespace, key, text],
      )
      .map_err(|e| storage_err("Failed to write entry", e))?;
    Ok(())
  }

  fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
    let conn = self.lock()?;
    let removed = conn
      .execute(
        "DELETE FROM entries WHERE namespace = ? AND entry_key = ?",
        params![namespace, key],
      )
      .map_err(|e| storage_err("Failed to delete entry", e))?;
    Ok(removed > 0)
  }

  fn keys(&self, namespace: &str, prefix: &str) -> Result<Vec<String>> {
    let conn = self.lock()?;
    let mut stmt = conn
      .prepare(
        "SELECT entry_key FROM entries
         WHERE namespace = ? AND substr(entry_key, 1, length(?)) = ?
         ORDER BY entry_key",
      )
      .map_err(|e| storage_err("Failed to prepare key query", e))?;

    let keys = stmt
      .query_map(params![namespace, prefix, prefix], |row| row.get(0))
      .map_err(|e| storage_err("Failed to list keys", e))?
      .collect::<std::result::Result<Vec<String>, _>>()
      .map_err(|e| storage_err("Failed to read key", e))?;

    Ok(keys)
  }

  fn clear(&self, namespace: &str) -> Result<usize> {
    let conn = self.lock()?;
    conn
      .execute(
        "DELETE FROM entries WHERE namespace = ?",
        params![namespace],
      )
      .map_err(|e| storage_err("Failed to clear namespace", e))
  }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<BTreeMap<(String, String), String>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<(String, String), String>>> {
    self
      .entries
      .lock()
      .map_err(|e| FetchError::Storage(format!("Lock poisoned: {}", e)))
  }
}

impl Storage for MemoryStorage {
  fn read_text(&self, namespace: &str, key: &str) -> Result<Option<String>> {
    let entries = self.lock()?;
    Ok(entries.get(&(namespace.to_string(), key.to_string())).cloned())
  }

  fn write_text(&self, namespace: &str, key: &str, text: &str) -> Result<()> {
    let mut entries = self.lock()?;
    entries.insert((namespace.to_string(), key.to_string()), text.to_string());
    Ok(())
  }

  fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
    let mut entries = self.lock()?;
    Ok(
      entries
        .remove(&(namespace.to_string(), key.to_string()))
        .is_some(),
    )
  }

  fn keys(&self, namespace: &str, prefix: &str) -> Result<Vec<String>> {
    let entries = self.lock()?;
    Ok(
      entries
        .keys()
        .filter(|(ns, key)| ns == namespace && key.starts_with(prefix))
        .map(|(_, key)| key.clone())
        .collect(),
    )
  }

  fn clear(&self, namespace: &str) -> Result<usize> {
    let mut entries = self.lock()?;
    let before = entries.len();
    entries.retain(|(ns, _), _| ns != namespace);
    Ok(before - entries.len())
  }
}
