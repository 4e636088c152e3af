use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{HarmonyError, Result};
use crate::operation::Operation;
use crate::query::Query;
use crate::validation::{Validatable, ValidationResult, ValidationStrategy};

use super::{DeleteRepository, GetRepository, PutRepository, Repository};

/// Main + cache pair, orchestrated by [`Operation`].
///
/// | operation | get | put | delete |
/// |---|---|---|---|
/// | `Main` | main | main | main |
/// | `MainSync` | main, then store in cache | main, then cache | both |
/// | `Cache` | cache, `NotValid` if stale | cache | cache |
/// | `CacheSync`, `Default` | valid cache, else main + store | `Default`: main then cache, `CacheSync`: cache then main | both |
///
/// With offline fallback enabled, a cache-first read whose main fetch fails
/// with a transport error serves the stale cached value instead.
///
/// Inner repositories are always called with [`Operation::Default`].
pub struct CacheRepository<M: Send + 'static> {
  main: Arc<dyn Repository<M>>,
  cache: Arc<dyn Repository<M>>,
  validator: Arc<dyn ValidationStrategy>,
  offline_fallback: bool,
}

impl<M> CacheRepository<M>
where
  M: Validatable + Send + Sync + 'static,
{
  pub fn new(
    main: Arc<dyn Repository<M>>,
    cache: Arc<dyn Repository<M>>,
    validator: Arc<dyn ValidationStrategy>,
  ) -> Self {
    Self {
      main,
      cache,
      validator,
      offline_fallback: false,
    }
  }

  /// Serve stale cache entries when the main source is unreachable.
  pub fn with_offline_fallback(mut self, enabled: bool) -> Self {
    self.offline_fallback = enabled;
    self
  }

  fn is_valid(&self, value: &M) -> Result<bool> {
    Ok(self.validator.is_valid(value)? == ValidationResult::Valid)
  }

  fn all_valid(&self, values: &[M]) -> Result<bool> {
    for value in values {
      if !self.is_valid(value)? {
        return Ok(false);
      }
    }
    Ok(true)
  }

  fn offline<T>(&self, err: HarmonyError, stale: Option<T>, query: &Query) -> Result<T> {
    match stale {
      Some(value) if self.offline_fallback && matches!(err, HarmonyError::Transport(_)) => {
        warn!(query = query.kind(), error = %err, "main source unreachable, serving stale cache");
        Ok(value)
      }
      _ => Err(err),
    }
  }
}

/// Cached value worth returning as is, or kept aside as stale.
enum Lookup<T> {
  Fresh(T),
  Stale(Option<T>),
}

fn lookup<T>(cached: Result<T>, valid: impl Fn(&T) -> Result<bool>) -> Result<Lookup<T>> {
  match cached {
    Ok(value) if valid(&value)? => Ok(Lookup::Fresh(value)),
    Ok(value) => Ok(Lookup::Stale(Some(value))),
    Err(err) if err.is_miss() => Ok(Lookup::Stale(None)),
    Err(err) => Err(err),
  }
}

#[async_trait]
impl<M> GetRepository<M> for CacheRepository<M>
where
  M: Validatable + Send + Sync + 'static,
{
  async fn get(&self, query: &Query, operation: Operation) -> Result<M> {
    debug!(query = query.kind(), ?operation, "cache repository get");
    match operation {
      Operation::Main => self.main.get(query, Operation::Default).await,
      Operation::MainSync => {
        let value = self.main.get(query, Operation::Default).await?;
        self.cache.put(query, Some(value), Operation::Default).await
      }
      Operation::Cache => {
        let value = self.cache.get(query, Operation::Default).await?;
        if self.is_valid(&value)? {
          Ok(value)
        } else {
          Err(HarmonyError::NotValid)
        }
      }
      Operation::Default | Operation::CacheSync => {
        let cached = self.cache.get(query, Operation::Default).await;
        let stale = match lookup(cached, |value| self.is_valid(value))? {
          Lookup::Fresh(value) => return Ok(value),
          Lookup::Stale(stale) => stale,
        };

        match self.main.get(query, Operation::Default).await {
          Ok(value) => self.cache.put(query, Some(value), Operation::Default).await,
          Err(err) => self.offline(err, stale, query),
        }
      }
    }
  }

  async fn get_all(&self, query: &Query, operation: Operation) -> Result<Vec<M>> {
    debug!(query = query.kind(), ?operation, "cache repository get_all");
    match operation {
      Operation::Main => self.main.get_all(query, Operation::Default).await,
      Operation::MainSync => {
        let values = self.main.get_all(query, Operation::Default).await?;
        self.cache.put_all(query, Some(values), Operation::Default).await
      }
      Operation::Cache => {
        let values = self.cache.get_all(query, Operation::Default).await?;
        if self.all_valid(&values)? {
          Ok(values)
        } else {
          Err(HarmonyError::NotValid)
        }
      }
      Operation::Default | Operation::CacheSync => {
        let cached = self.cache.get_all(query, Operation::Default).await;
        let stale = match lookup(cached, |values| self.all_valid(values))? {
          Lookup::Fresh(values) => return Ok(values),
          Lookup::Stale(stale) => stale,
        };

        match self.main.get_all(query, Operation::Default).await {
          Ok(values) => self.cache.put_all(query, Some(values), Operation::Default).await,
          Err(err) => self.offline(err, stale, query),
        }
      }
    }
  }
}

#[async_trait]
impl<M> PutRepository<M> for CacheRepository<M>
where
  M: Validatable + Send + Sync + 'static,
{
  async fn put(&self, query: &Query, value: Option<M>, operation: Operation) -> Result<M> {
    debug!(query = query.kind(), ?operation, "cache repository put");
    match operation {
      Operation::Main => self.main.put(query, value, Operation::Default).await,
      Operation::Cache => self.cache.put(query, value, Operation::Default).await,
      Operation::Default | Operation::MainSync => {
        let stored = self.main.put(query, value, Operation::Default).await?;
        self.cache.put(query, Some(stored), Operation::Default).await
      }
      Operation::CacheSync => {
        let stored = self.cache.put(query, value, Operation::Default).await?;
        self.main.put(query, Some(stored), Operation::Default).await
      }
    }
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<M>>,
    operation: Operation,
  ) -> Result<Vec<M>> {
    debug!(query = query.kind(), ?operation, "cache repository put_all");
    match operation {
      Operation::Main => self.main.put_all(query, values, Operation::Default).await,
      Operation::Cache => self.cache.put_all(query, values, Operation::Default).await,
      Operation::Default | Operation::MainSync => {
        let stored = self.main.put_all(query, values, Operation::Default).await?;
        self.cache.put_all(query, Some(stored), Operation::Default).await
      }
      Operation::CacheSync => {
        let stored = self.cache.put_all(query, values, Operation::Default).await?;
        self.main.put_all(query, Some(stored), Operation::Default).await
      }
    }
  }
}

#[async_trait]
impl<M> DeleteRepository for CacheRepository<M>
where
  M: Validatable + Send + Sync + 'static,
{
  async fn delete(&self, query: &Query, operation: Operation) -> Result<()> {
    debug!(query = query.kind(), ?operation, "cache repository delete");
    match operation {
      Operation::Main => self.main.delete(query, Operation::Default).await,
      Operation::Cache => self.cache.delete(query, Operation::Default).await,
      Operation::Default | Operation::MainSync | Operation::CacheSync => {
        self.main.delete(query, Operation::Default).await?;
        self.cache.delete(query, Operation::Default).await
      }
    }
  }

  async fn delete_all(&self, query: &Query, operation: Operation) -> Result<()> {
    debug!(query = query.kind(), ?operation, "cache repository delete_all");
    match operation {
      Operation::Main => self.main.delete_all(query, Operation::Default).await,
      Operation::Cache => self.cache.delete_all(query, Operation::Default).await,
      Operation::Default | Operation::MainSync | Operation::CacheSync => {
        self.main.delete_all(query, Operation::Default).await?;
        self.cache.delete_all(query, Operation::Default).await
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::{FixedClock, Millis, Seconds};
  use crate::datasource::InMemoryDataSource;
  use crate::validation::{TimestampValidationEntity, TimestampValidationStrategy};
  use std::sync::atomic::{AtomicUsize, Ordering};

  const NOW: Millis = 1_700_000_000_000;

  #[derive(Debug, Clone, PartialEq)]
  struct Entry {
    name: String,
    fetched_at: Millis,
  }

  impl Entry {
    fn new(name: &str, fetched_at: Millis) -> Self {
      Self {
        name: name.to_string(),
        fetched_at,
      }
    }
  }

  impl TimestampValidationEntity for Entry {
    fn last_updated_at(&self) -> Millis {
      self.fetched_at
    }

    fn expire_in(&self) -> Seconds {
      60
    }
  }

  impl Validatable for Entry {
    fn as_timestamped(&self) -> Option<&dyn TimestampValidationEntity> {
      Some(self)
    }
  }

  /// Main source that is unreachable and counts how often it was asked.
  #[derive(Default)]
  struct Offline {
    calls: AtomicUsize,
  }

  impl Offline {
    fn fail<T>(&self) -> Result<T> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      Err(HarmonyError::Transport("connection refused".to_string()))
    }
  }

  #[async_trait]
  impl GetRepository<Entry> for Offline {
    async fn get(&self, _query: &Query, _operation: Operation) -> Result<Entry> {
      self.fail()
    }

    async fn get_all(&self, _query: &Query, _operation: Operation) -> Result<Vec<Entry>> {
      self.fail()
    }
  }

  #[async_trait]
  impl PutRepository<Entry> for Offline {
    async fn put(&self, _query: &Query, _value: Option<Entry>, _operation: Operation) -> Result<Entry> {
      self.fail()
    }

    async fn put_all(
      &self,
      _query: &Query,
      _values: Option<Vec<Entry>>,
      _operation: Operation,
    ) -> Result<Vec<Entry>> {
      self.fail()
    }
  }

  #[async_trait]
  impl DeleteRepository for Offline {
    async fn delete(&self, _query: &Query, _operation: Operation) -> Result<()> {
      self.fail()
    }

    async fn delete_all(&self, _query: &Query, _operation: Operation) -> Result<()> {
      self.fail()
    }
  }

  struct Fixture {
    main: Arc<InMemoryDataSource<Entry>>,
    cache: Arc<InMemoryDataSource<Entry>>,
    repository: CacheRepository<Entry>,
  }

  fn fixture() -> Fixture {
    let main: Arc<InMemoryDataSource<Entry>> = Arc::new(InMemoryDataSource::new());
    let cache: Arc<InMemoryDataSource<Entry>> = Arc::new(InMemoryDataSource::new());
    let clock = Arc::new(FixedClock::new(NOW));
    let repository = CacheRepository::<Entry>::new(
      main.clone(),
      cache.clone(),
      Arc::new(TimestampValidationStrategy::with_clock(clock)),
    );
    Fixture {
      main,
      cache,
      repository,
    }
  }

  fn offline_fixture(
    fallback: bool,
  ) -> (Arc<Offline>, Arc<InMemoryDataSource<Entry>>, CacheRepository<Entry>) {
    let main = Arc::new(Offline::default());
    let cache: Arc<InMemoryDataSource<Entry>> = Arc::new(InMemoryDataSource::new());
    let clock = Arc::new(FixedClock::new(NOW));
    let repository = CacheRepository::<Entry>::new(
      main.clone(),
      cache.clone(),
      Arc::new(TimestampValidationStrategy::with_clock(clock)),
    )
    .with_offline_fallback(fallback);
    (main, cache, repository)
  }

  async fn seed(source: &InMemoryDataSource<Entry>, key: i64, entry: Entry) {
    source.put(&Query::id(key), Some(entry), Operation::Default).await.unwrap();
  }

  #[tokio::test]
  async fn test_default_serves_fresh_cache() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("cached", NOW - 1_000)).await;
    seed(&f.main, 1, Entry::new("remote", NOW)).await;

    let value = f.repository.get(&Query::id(1), Operation::Default).await.unwrap();
    assert_eq!(value.name, "cached");
  }

  #[tokio::test]
  async fn test_default_refreshes_stale_cache() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("cached", NOW - 120_000)).await;
    seed(&f.main, 1, Entry::new("remote", NOW)).await;

    let value = f.repository.get(&Query::id(1), Operation::Default).await.unwrap();
    assert_eq!(value.name, "remote");
    let cached = f.cache.get(&Query::id(1), Operation::Default).await.unwrap();
    assert_eq!(cached.name, "remote");
  }

  #[tokio::test]
  async fn test_cache_sync_fills_empty_cache() {
    let f = fixture();
    seed(&f.main, 1, Entry::new("remote", NOW)).await;

    let value = f.repository.get(&Query::id(1), Operation::CacheSync).await.unwrap();
    assert_eq!(value.name, "remote");
    assert_eq!(f.cache.len().unwrap(), 1);
  }

  #[tokio::test]
  async fn test_main_skips_cache() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("cached", NOW)).await;
    seed(&f.main, 1, Entry::new("remote", NOW)).await;

    let value = f.repository.get(&Query::id(1), Operation::Main).await.unwrap();
    assert_eq!(value.name, "remote");
    assert_eq!(
      f.cache.get(&Query::id(1), Operation::Default).await.unwrap().name,
      "cached"
    );
  }

  #[tokio::test]
  async fn test_main_sync_writes_through() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("cached", NOW)).await;
    seed(&f.main, 1, Entry::new("remote", NOW)).await;

    let value = f.repository.get(&Query::id(1), Operation::MainSync).await.unwrap();
    assert_eq!(value.name, "remote");
    assert_eq!(
      f.cache.get(&Query::id(1), Operation::Default).await.unwrap().name,
      "remote"
    );
  }

  #[tokio::test]
  async fn test_cache_only_rejects_stale_value() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("cached", NOW - 60_000)).await;

    let err = f.repository.get(&Query::id(1), Operation::Cache).await.unwrap_err();
    assert_eq!(err, HarmonyError::NotValid);

    let err = f.repository.get(&Query::id(2), Operation::Cache).await.unwrap_err();
    assert!(matches!(err, HarmonyError::NotFound(_)));
  }

  #[tokio::test]
  async fn test_get_all_refreshes_when_any_entry_is_stale() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("fresh", NOW)).await;
    seed(&f.cache, 2, Entry::new("stale", NOW - 90_000)).await;
    seed(&f.main, 1, Entry::new("remote-1", NOW)).await;
    seed(&f.main, 2, Entry::new("remote-2", NOW)).await;

    let values = f
      .repository
      .get_all(&Query::ids([1, 2]), Operation::Default)
      .await
      .unwrap();
    let names: Vec<&str> = values.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["remote-1", "remote-2"]);
  }

  #[tokio::test]
  async fn test_offline_fallback_serves_stale_value() {
    let (main, cache, repository) = offline_fixture(true);
    seed(&cache, 1, Entry::new("stale", NOW - 600_000)).await;

    let value = repository.get(&Query::id(1), Operation::Default).await.unwrap();
    assert_eq!(value.name, "stale");
    assert_eq!(main.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_get_all_offline_fallback_serves_stale_list() {
    let (main, cache, repository) = offline_fixture(true);
    seed(&cache, 1, Entry::new("stale-1", NOW - 600_000)).await;
    seed(&cache, 2, Entry::new("stale-2", NOW - 600_000)).await;

    let values = repository
      .get_all(&Query::ids([1, 2]), Operation::Default)
      .await
      .unwrap();
    let names: Vec<&str> = values.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["stale-1", "stale-2"]);

    let values = repository.get_all(&Query::All, Operation::CacheSync).await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(main.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_get_all_without_fallback_transport_error_surfaces() {
    let (_main, cache, repository) = offline_fixture(false);
    seed(&cache, 1, Entry::new("stale", NOW - 600_000)).await;

    let err = repository
      .get_all(&Query::ids([1]), Operation::Default)
      .await
      .unwrap_err();
    assert_eq!(err, HarmonyError::Transport("connection refused".to_string()));
  }

  #[tokio::test]
  async fn test_cache_only_rejects_list_with_stale_entry() {
    let f = fixture();
    seed(&f.cache, 1, Entry::new("fresh", NOW)).await;
    seed(&f.cache, 2, Entry::new("stale", NOW - 90_000)).await;

    let err = f
      .repository
      .get_all(&Query::ids([1, 2]), Operation::Cache)
      .await
      .unwrap_err();
    assert_eq!(err, HarmonyError::NotValid);

    let values = f
      .repository
      .get_all(&Query::ids([1]), Operation::Cache)
      .await
      .unwrap();
    assert_eq!(values, vec![Entry::new("fresh", NOW)]);
  }

  #[tokio::test]
  async fn test_get_all_everything_fills_empty_cache() {
    let f = fixture();
    seed(&f.main, 1, Entry::new("remote-1", NOW)).await;
    seed(&f.main, 2, Entry::new("remote-2", NOW)).await;

    let values = f.repository.get_all(&Query::All, Operation::Default).await.unwrap();
    let names: Vec<&str> = values.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["remote-1", "remote-2"]);
    assert_eq!(f.cache.len().unwrap(), 2);

    // Served from the cache now, main changes are not seen
    f.main.delete_all(&Query::All, Operation::Default).await.unwrap();
    let values = f.repository.get_all(&Query::All, Operation::Default).await.unwrap();
    assert_eq!(values.len(), 2);
  }

  #[tokio::test]
  async fn test_get_all_main_sync_writes_list_through() {
    let f = fixture();
    for key in [5, 6, 7] {
      seed(&f.cache, key, Entry::new("old", NOW)).await;
    }
    seed(&f.main, 1, Entry::new("remote-1", NOW)).await;
    seed(&f.main, 2, Entry::new("remote-2", NOW)).await;

    let values = f.repository.get_all(&Query::All, Operation::MainSync).await.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(
      f.cache.get_all(&Query::All, Operation::Default).await.unwrap(),
      values
    );

    f.repository
      .get_all(&Query::ids([1]), Operation::MainSync)
      .await
      .unwrap();
    assert_eq!(
      f.cache.get(&Query::id(1), Operation::Default).await.unwrap().name,
      "remote-1"
    );
  }

  #[tokio::test]
  async fn test_without_fallback_transport_error_surfaces() {
    let (_main, cache, repository) = offline_fixture(false);
    seed(&cache, 1, Entry::new("stale", NOW - 600_000)).await;

    let err = repository.get(&Query::id(1), Operation::Default).await.unwrap_err();
    assert_eq!(err, HarmonyError::Transport("connection refused".to_string()));
  }

  #[tokio::test]
  async fn test_fallback_needs_a_cached_value() {
    let (_main, _cache, repository) = offline_fixture(true);
    let err = repository.get(&Query::id(1), Operation::Default).await.unwrap_err();
    assert_eq!(err, HarmonyError::Transport("connection refused".to_string()));
  }

  #[tokio::test]
  async fn test_put_order_follows_operation() {
    let (main, cache, repository) = offline_fixture(false);
    let entry = Entry::new("new", NOW);

    // Main first: the cache is never reached
    let err = repository
      .put(&Query::id(1), Some(entry.clone()), Operation::Default)
      .await
      .unwrap_err();
    assert!(matches!(err, HarmonyError::Transport(_)));
    assert!(cache.is_empty().unwrap());

    // Cache first: the cache keeps the value even though main fails
    let err = repository
      .put(&Query::id(1), Some(entry.clone()), Operation::CacheSync)
      .await
      .unwrap_err();
    assert!(matches!(err, HarmonyError::Transport(_)));
    assert_eq!(cache.len().unwrap(), 1);
    assert_eq!(main.calls.load(Ordering::SeqCst), 2);

    repository
      .put(&Query::id(2), Some(entry), Operation::Cache)
      .await
      .unwrap();
    assert_eq!(cache.len().unwrap(), 2);
    assert_eq!(main.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_put_default_writes_both() {
    let f = fixture();
    f.repository
      .put_all(
        &Query::ids([1, 2]),
        Some(vec![Entry::new("a", NOW), Entry::new("b", NOW)]),
        Operation::Default,
      )
      .await
      .unwrap();
    assert_eq!(f.main.len().unwrap(), 2);
    assert_eq!(f.cache.len().unwrap(), 2);
  }

  #[tokio::test]
  async fn test_delete_targets() {
    let f = fixture();
    for source in [&f.main, &f.cache] {
      seed(source, 1, Entry::new("a", NOW)).await;
      seed(source, 2, Entry::new("b", NOW)).await;
    }

    f.repository.delete(&Query::id(1), Operation::Cache).await.unwrap();
    assert_eq!((f.main.len().unwrap(), f.cache.len().unwrap()), (2, 1));

    f.repository.delete(&Query::id(2), Operation::Main).await.unwrap();
    assert_eq!((f.main.len().unwrap(), f.cache.len().unwrap()), (1, 1));

    f.repository.delete_all(&Query::All, Operation::Default).await.unwrap();
    assert!(f.main.is_empty().unwrap() && f.cache.is_empty().unwrap());
  }
}
