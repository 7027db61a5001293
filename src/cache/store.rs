//! Shared cache storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// A persisted key-value store shared between the application process and
/// the widget-rendering process.
///
/// Writes are durable across restarts and visible to any reader of the same
/// store on its next read; there is no caching layer on top. The application
/// process is the sole writer. Single-key writes are atomic; the typed layer
/// above keeps each logical unit (daily entry, full history) under one key
/// so no multi-key ordering is needed.
pub trait SharedCache: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
  fn set(&self, key: &str, value: &[u8]) -> Result<()>;
  fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed shared cache.
///
/// Opened in WAL mode with a busy timeout so the widget process can read the
/// same file while the application process writes.
pub struct SqliteCache {
  conn: Mutex<Connection>,
}

/// Schema for the shared key-value table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_cache (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteCache {
  /// Open (or create) the shared cache database at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    conn
      .execute_batch("PRAGMA journal_mode=WAL;")
      .map_err(|e| eyre!("Failed to enable WAL mode: {}", e))?;
    conn
      .busy_timeout(std::time::Duration::from_secs(5))
      .map_err(|e| eyre!("Failed to set busy timeout: {}", e))?;

    let cache = Self {
      conn: Mutex::new(conn),
    };
    cache.run_migrations()?;

    Ok(cache)
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

impl SharedCache for SqliteCache {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_cache WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache key {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_cache (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write cache key {}: {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_cache WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove cache key {}: {}", key, e))?;

    Ok(())
  }
}

/// In-memory shared cache used by tests and single-shot tooling.
#[derive(Default)]
pub struct MemoryCache {
  map: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
  pub fn new() -> Self {
    Self::default()
  }
}

impl SharedCache for MemoryCache {
  fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let map = self
      .map
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(map.get(key).cloned())
  }

  fn set(&self, key: &str, value: &[u8]) -> Result<()> {
    let mut map = self
      .map
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    map.insert(key.to_string(), value.to_vec());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut map = self
      .map
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    map.remove(key);
    Ok(())
  }
}
