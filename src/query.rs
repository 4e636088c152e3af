//! Query descriptors: immutable values describing what to fetch or store.
//!
//! A [`Query`] carries identity and filtering data only. Repositories decide
//! which variants they understand and reject the rest with
//! [`HarmonyError::QueryNotSupported`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::{HarmonyError, Result};
use crate::network::NetworkQuery;

/// Key of a single entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
  Int(i64),
  Str(String),
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Int(value) => write!(f, "{}", value),
      Self::Str(value) => f.write_str(value),
    }
  }
}

impl From<i64> for Key {
  fn from(value: i64) -> Self {
    Self::Int(value)
  }
}

impl From<i32> for Key {
  fn from(value: i32) -> Self {
    Self::Int(i64::from(value))
  }
}

impl From<u32> for Key {
  fn from(value: u32) -> Self {
    Self::Int(i64::from(value))
  }
}

impl From<&str> for Key {
  fn from(value: &str) -> Self {
    Self::Str(value.to_string())
  }
}

impl From<String> for Key {
  fn from(value: String) -> Self {
    Self::Str(value)
  }
}

impl From<&String> for Key {
  fn from(value: &String) -> Self {
    Self::Str(value.clone())
  }
}

/// Domain-specific query payload for cases the built-in variants don't cover.
///
/// Repositories recover the concrete type with [`CustomQuery::downcast_ref`].
#[derive(Clone)]
pub struct CustomQuery(Arc<dyn Any + Send + Sync>);

impl CustomQuery {
  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self(Arc::new(value))
  }

  pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
    self.0.downcast_ref::<T>()
  }
}

impl fmt::Debug for CustomQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("CustomQuery(..)")
  }
}

/// Describes what a repository call should read, write or delete.
#[derive(Debug, Clone, Default)]
pub enum Query {
  /// No parameters
  #[default]
  Void,
  /// A single entity
  Id(Key),
  /// Several entities, in the given order
  Ids(Vec<Key>),
  /// Every entity the source holds
  All,
  /// A page of entities
  Pagination { offset: usize, limit: usize },
  /// A request against a network data source
  Network(NetworkQuery),
  /// Anything else
  Custom(CustomQuery),
}

impl Query {
  pub fn id(key: impl Into<Key>) -> Self {
    Self::Id(key.into())
  }

  pub fn ids<K: Into<Key>>(keys: impl IntoIterator<Item = K>) -> Self {
    Self::Ids(keys.into_iter().map(Into::into).collect())
  }

  pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
    Self::Custom(CustomQuery::new(value))
  }

  /// The key of an [`Query::Id`] query.
  pub fn key(&self) -> Option<&Key> {
    match self {
      Self::Id(key) => Some(key),
      _ => None,
    }
  }

  /// Short variant name, used in logs and error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Void => "void",
      Self::Id(_) => "id",
      Self::Ids(_) => "ids",
      Self::All => "all",
      Self::Pagination { .. } => "pagination",
      Self::Network(_) => "network",
      Self::Custom(_) => "custom",
    }
  }

  /// Stable, fixed-length key for persisting the result of this query.
  ///
  /// Equal queries always produce the same key. Custom queries have no
  /// canonical form and are rejected.
  pub fn cache_key(&self) -> Result<String> {
    let input = match self {
      Self::Void => "void".to_string(),
      Self::All => "all".to_string(),
      Self::Id(key) => format!("id:{}", key_input(key)),
      Self::Ids(keys) => {
        let keys: Vec<String> = keys.iter().map(key_input).collect();
        format!("ids:{}", keys.join(","))
      }
      Self::Pagination { offset, limit } => format!("pagination:{}:{}", offset, limit),
      Self::Network(query) => format!("network:{}", query.canonical()),
      Self::Custom(_) => {
        return Err(HarmonyError::QueryNotSupported(
          "custom queries have no cache key".to_string(),
        ))
      }
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Ok(hex::encode(hasher.finalize()))
  }

  pub(crate) fn unsupported(&self, by: &str) -> HarmonyError {
    HarmonyError::QueryNotSupported(format!("{} query not supported by {}", self.kind(), by))
  }
}

/// Keys are tagged so that `Int(1)` and `Str("1")` never collide.
fn key_input(key: &Key) -> String {
  match key {
    Key::Int(value) => format!("i{}", value),
    Key::Str(value) => format!("s{}", value),
  }
}

impl From<NetworkQuery> for Query {
  fn from(query: NetworkQuery) -> Self {
    Self::Network(query)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::network::Method;

  #[derive(Debug, PartialEq)]
  struct ByEmail(String);

  #[test]
  fn test_default_query_is_void() {
    assert!(matches!(Query::default(), Query::Void));
  }

  #[test]
  fn test_convenience_constructors() {
    assert_eq!(Query::id(7).key(), Some(&Key::Int(7)));
    match Query::ids(["a", "b"]) {
      Query::Ids(keys) => assert_eq!(keys, vec![Key::from("a"), Key::from("b")]),
      other => panic!("unexpected query {:?}", other),
    }
  }

  #[test]
  fn test_custom_query_downcast() {
    let query = Query::custom(ByEmail("a@b.c".to_string()));
    let Query::Custom(custom) = query else {
      panic!("expected custom query");
    };
    assert_eq!(custom.downcast_ref::<ByEmail>(), Some(&ByEmail("a@b.c".to_string())));
    assert!(custom.downcast_ref::<String>().is_none());
  }

  #[test]
  fn test_cache_key_is_stable() {
    let a = Query::id("user-1").cache_key().unwrap();
    let b = Query::id("user-1").cache_key().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
  }

  #[test]
  fn test_cache_key_distinguishes_key_types() {
    let int_key = Query::id(1).cache_key().unwrap();
    let str_key = Query::id("1").cache_key().unwrap();
    assert_ne!(int_key, str_key);
  }

  #[test]
  fn test_cache_key_for_network_queries() {
    let users = Query::from(NetworkQuery::new(Method::Get, "/users"));
    let posts = Query::from(NetworkQuery::new(Method::Get, "/posts"));
    assert_ne!(users.cache_key().unwrap(), posts.cache_key().unwrap());
  }

  #[test]
  fn test_custom_query_has_no_cache_key() {
    let err = Query::custom(1u8).cache_key().unwrap_err();
    assert!(matches!(err, HarmonyError::QueryNotSupported(_)));
  }
}
