use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{HarmonyError, Result};
use crate::operation::Operation;
use crate::query::{Key, Query};
use crate::repository::{DeleteRepository, GetRepository, PutRepository};

const NAME: &str = "InMemoryDataSource";

/// Key/value store living in process memory.
///
/// Single-entity calls take [`Query::Id`]. List calls take [`Query::Ids`]
/// (positional keys) or [`Query::All`] / [`Query::Void`] (every entry, in
/// key order). `put_all` with `All` / `Void` replaces the whole store with
/// the list, keyed by position, so a later `get_all` returns it in the same
/// order. The operation is ignored.
pub struct InMemoryDataSource<V> {
  entries: RwLock<BTreeMap<Key, V>>,
}

impl<V> InMemoryDataSource<V> {
  pub fn new() -> Self {
    Self {
      entries: RwLock::new(BTreeMap::new()),
    }
  }

  pub fn len(&self) -> Result<usize> {
    Ok(self.entries.read().map_err(poisoned)?.len())
  }

  pub fn is_empty(&self) -> Result<bool> {
    Ok(self.len()? == 0)
  }
}

impl<V> Default for InMemoryDataSource<V> {
  fn default() -> Self {
    Self::new()
  }
}

fn poisoned<E: std::fmt::Display>(e: E) -> HarmonyError {
  HarmonyError::Storage(format!("Lock poisoned: {}", e))
}

fn single_key(query: &Query) -> Result<&Key> {
  query.key().ok_or_else(|| query.unsupported(NAME))
}

fn not_found(key: &Key) -> HarmonyError {
  HarmonyError::NotFound(format!("no entry for key {}", key))
}

#[async_trait]
impl<V> GetRepository<V> for InMemoryDataSource<V>
where
  V: Clone + Send + Sync + 'static,
{
  async fn get(&self, query: &Query, _operation: Operation) -> Result<V> {
    let key = single_key(query)?;
    let entries = self.entries.read().map_err(poisoned)?;
    entries.get(key).cloned().ok_or_else(|| not_found(key))
  }

  async fn get_all(&self, query: &Query, _operation: Operation) -> Result<Vec<V>> {
    let entries = self.entries.read().map_err(poisoned)?;
    match query {
      Query::Ids(keys) => keys
        .iter()
        .map(|key| entries.get(key).cloned().ok_or_else(|| not_found(key)))
        .collect(),
      Query::All | Query::Void => {
        if entries.is_empty() {
          return Err(HarmonyError::NotFound("store is empty".to_string()));
        }
        Ok(entries.values().cloned().collect())
      }
      _ => Err(query.unsupported(NAME)),
    }
  }
}

#[async_trait]
impl<V> PutRepository<V> for InMemoryDataSource<V>
where
  V: Clone + Send + Sync + 'static,
{
  async fn put(&self, query: &Query, value: Option<V>, _operation: Operation) -> Result<V> {
    let key = single_key(query)?;
    let value = value.ok_or_else(|| {
      HarmonyError::InvalidArgument("in-memory store cannot generate values".to_string())
    })?;
    let mut entries = self.entries.write().map_err(poisoned)?;
    entries.insert(key.clone(), value.clone());
    Ok(value)
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<V>>,
    _operation: Operation,
  ) -> Result<Vec<V>> {
    if !matches!(query, Query::Ids(_) | Query::All | Query::Void) {
      return Err(query.unsupported(NAME));
    }
    let values = values.ok_or_else(|| {
      HarmonyError::InvalidArgument("in-memory store cannot generate values".to_string())
    })?;

    match query {
      Query::Ids(keys) => {
        if keys.len() != values.len() {
          return Err(HarmonyError::InvalidArgument(format!(
            "{} keys for {} values",
            keys.len(),
            values.len()
          )));
        }
        let mut entries = self.entries.write().map_err(poisoned)?;
        for (key, value) in keys.iter().zip(&values) {
          entries.insert(key.clone(), value.clone());
        }
      }
      _ => {
        let mut entries = self.entries.write().map_err(poisoned)?;
        *entries = (0_i64..)
          .map(Key::Int)
          .zip(values.iter().cloned())
          .collect();
      }
    }
    Ok(values)
  }
}

#[async_trait]
impl<V> DeleteRepository for InMemoryDataSource<V>
where
  V: Send + Sync + 'static,
{
  async fn delete(&self, query: &Query, _operation: Operation) -> Result<()> {
    let key = single_key(query)?;
    let mut entries = self.entries.write().map_err(poisoned)?;
    entries.remove(key).map(|_| ()).ok_or_else(|| not_found(key))
  }

  async fn delete_all(&self, query: &Query, _operation: Operation) -> Result<()> {
    let mut entries = self.entries.write().map_err(poisoned)?;
    match query {
      Query::Ids(keys) => {
        for key in keys {
          entries.remove(key);
        }
        Ok(())
      }
      Query::All | Query::Void => {
        entries.clear();
        Ok(())
      }
      _ => Err(query.unsupported(NAME)),
    }
  }
}
