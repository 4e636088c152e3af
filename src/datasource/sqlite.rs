//! SQLite-backed persistent cache.
//!
//! One database file holds every entity type. Each [`SqliteDataSource`] is a
//! typed view over it, scoped by an entity type name, storing serde-JSON
//! values under [`Query::cache_key`].

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{HarmonyError, Result};
use crate::operation::Operation;
use crate::query::Query;
use crate::repository::{DeleteRepository, GetRepository, PutRepository};

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Single entities (serialized JSON)
CREATE TABLE IF NOT EXISTS entity_cache (
    entity_type TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (entity_type, entity_key)
);

-- List results (serialized JSON array, order preserved)
CREATE TABLE IF NOT EXISTS query_cache (
    entity_type TEXT NOT NULL,
    query_hash TEXT NOT NULL,
    data BLOB NOT NULL,
    result_count INTEGER NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (entity_type, query_hash)
);
"#;

/// Shared SQLite connection holding the cache tables.
pub struct CacheDatabase {
  conn: Mutex<Connection>,
}

impl CacheDatabase {
  /// Open the database at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        HarmonyError::Storage(format!("Failed to create cache directory: {}", e))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      HarmonyError::Storage(format!(
        "Failed to open cache database at {}: {}",
        path.display(),
        e
      ))
    })?;
    debug!(path = %path.display(), "opened cache database");
    Self::with_connection(conn)
  }

  /// Throwaway database, mostly for tests.
  pub fn open_in_memory() -> Result<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  /// `<data dir>/harmony/cache.db`
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| HarmonyError::Storage("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("harmony").join("cache.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| HarmonyError::Storage(format!("Failed to run cache migrations: {}", e)))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| HarmonyError::Storage(format!("Lock poisoned: {}", e)))
  }

  /// Drop every cached row of every entity type.
  pub fn clear(&self) -> Result<usize> {
    let conn = self.lock()?;
    let entities = conn.execute("DELETE FROM entity_cache", [])?;
    let lists = conn.execute("DELETE FROM query_cache", [])?;
    Ok(entities + lists)
  }
}

/// Typed key/value view over a [`CacheDatabase`].
///
/// Accepts any query that has a cache key, i.e. everything but
/// [`Query::Custom`]. `delete_all` with [`Query::All`] or [`Query::Void`]
/// clears the whole entity type. `delete_all` with [`Query::Ids`] drops the
/// cached list for that query and the single entity stored under each id.
pub struct SqliteDataSource<V> {
  db: Arc<CacheDatabase>,
  entity_type: String,
  _value: PhantomData<fn() -> V>,
}

impl<V> SqliteDataSource<V> {
  pub fn new(db: Arc<CacheDatabase>, entity_type: impl Into<String>) -> Self {
    Self {
      db,
      entity_type: entity_type.into(),
      _value: PhantomData,
    }
  }

  pub fn entity_type(&self) -> &str {
    &self.entity_type
  }

  fn read(&self, table: Table, query: &Query) -> Result<Vec<u8>> {
    let key = query.cache_key()?;
    let conn = self.db.lock()?;
    let sql = format!(
      "SELECT data FROM {} WHERE entity_type = ? AND {} = ?",
      table.name(),
      table.key_column()
    );

    conn
      .query_row(&sql, params![self.entity_type, key], |row| row.get(0))
      .optional()?
      .ok_or_else(|| {
        HarmonyError::NotFound(format!("no cached {} for {} query", self.entity_type, query.kind()))
      })
  }

  fn remove(&self, table: Table, query: &Query) -> Result<()> {
    let conn = self.db.lock()?;
    match query {
      Query::All | Query::Void => {
        for table in [Table::Entity, Table::List] {
          let sql = format!("DELETE FROM {} WHERE entity_type = ?", table.name());
          conn.execute(&sql, params![self.entity_type])?;
        }
      }
      Query::Ids(keys) if matches!(table, Table::List) => {
        self.remove_row(&conn, Table::List, &query.cache_key()?)?;
        for key in keys {
          let entity_key = Query::Id(key.clone()).cache_key()?;
          self.remove_row(&conn, Table::Entity, &entity_key)?;
        }
      }
      _ => {
        self.remove_row(&conn, table, &query.cache_key()?)?;
      }
    }
    Ok(())
  }

  fn remove_row(&self, conn: &Connection, table: Table, key: &str) -> Result<usize> {
    let sql = format!(
      "DELETE FROM {} WHERE entity_type = ? AND {} = ?",
      table.name(),
      table.key_column()
    );
    Ok(conn.execute(&sql, params![self.entity_type, key])?)
  }
}

#[derive(Clone, Copy)]
enum Table {
  Entity,
  List,
}

impl Table {
  fn name(self) -> &'static str {
    match self {
      Self::Entity => "entity_cache",
      Self::List => "query_cache",
    }
  }

  fn key_column(self) -> &'static str {
    match self {
      Self::Entity => "entity_key",
      Self::List => "query_hash",
    }
  }
}

fn no_generator() -> HarmonyError {
  HarmonyError::InvalidArgument("sqlite cache cannot generate values".to_string())
}

#[async_trait]
impl<V> GetRepository<V> for SqliteDataSource<V>
where
  V: DeserializeOwned + Send + 'static,
{
  async fn get(&self, query: &Query, _operation: Operation) -> Result<V> {
    let data = self.read(Table::Entity, query)?;
    Ok(serde_json::from_slice(&data)?)
  }

  async fn get_all(&self, query: &Query, _operation: Operation) -> Result<Vec<V>> {
    let data = self.read(Table::List, query)?;
    Ok(serde_json::from_slice(&data)?)
  }
}

#[async_trait]
impl<V> PutRepository<V> for SqliteDataSource<V>
where
  V: Serialize + Send + Sync + 'static,
{
  async fn put(&self, query: &Query, value: Option<V>, _operation: Operation) -> Result<V> {
    let value = value.ok_or_else(no_generator)?;
    let key = query.cache_key()?;
    let data = serde_json::to_vec(&value)?;

    let conn = self.db.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO entity_cache (entity_type, entity_key, data, cached_at)
       VALUES (?, ?, ?, datetime('now'))",
      params![self.entity_type, key, data],
    )?;
    debug!(entity_type = %self.entity_type, "cached entity");
    Ok(value)
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<V>>,
    _operation: Operation,
  ) -> Result<Vec<V>> {
    let values = values.ok_or_else(no_generator)?;
    let key = query.cache_key()?;
    let data = serde_json::to_vec(&values)?;

    let conn = self.db.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO query_cache (entity_type, query_hash, data, result_count, cached_at)
       VALUES (?, ?, ?, ?, datetime('now'))",
      params![self.entity_type, key, data, values.len()],
    )?;
    debug!(entity_type = %self.entity_type, count = values.len(), "cached list");
    Ok(values)
  }
}

#[async_trait]
impl<V> DeleteRepository for SqliteDataSource<V>
where
  V: Send + 'static,
{
  async fn delete(&self, query: &Query, _operation: Operation) -> Result<()> {
    self.remove(Table::Entity, query)
  }

  async fn delete_all(&self, query: &Query, _operation: Operation) -> Result<()> {
    self.remove(Table::List, query)
  }
}
