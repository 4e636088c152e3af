//! Capability-based data-access contracts.
//!
//! A data source implements any subset of [`GetRepository`],
//! [`PutRepository`] and [`DeleteRepository`]. Decorators such as [`RepositoryMapper`] and
//! [`CacheRepository`] implement the same traits, so chains of any depth look like a
//! single repository to the caller.

mod cache;
mod mapper;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::operation::Operation;
use crate::query::Query;

pub use cache::CacheRepository;
pub use mapper::{GetRepositoryMapper, PutRepositoryMapper, RepositoryMapper};

/// Read capability.
#[async_trait]
pub trait GetRepository<M: Send + 'static>: Send + Sync {
  /// Fetch the entity matching `query`, or fail with `NotFound`.
  async fn get(&self, query: &Query, operation: Operation) -> Result<M>;

  /// Fetch every entity matching `query`.
  async fn get_all(&self, query: &Query, operation: Operation) -> Result<Vec<M>>;
}

/// Write capability.
///
/// A `None` value asks the store to generate the value itself (e.g. an
/// auto-increment row). Stores that can't do that reject it.
#[async_trait]
pub trait PutRepository<M: Send + 'static>: Send + Sync {
  async fn put(&self, query: &Query, value: Option<M>, operation: Operation) -> Result<M>;

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<M>>,
    operation: Operation,
  ) -> Result<Vec<M>>;
}

/// Delete capability.
#[async_trait]
pub trait DeleteRepository: Send + Sync {
  async fn delete(&self, query: &Query, operation: Operation) -> Result<()>;

  async fn delete_all(&self, query: &Query, operation: Operation) -> Result<()>;
}

/// All three capabilities at once, for decorators that need every one of
/// them from the repositories they wrap.
pub trait Repository<M: Send + 'static>: GetRepository<M> + PutRepository<M> + DeleteRepository {}

impl<M, R> Repository<M> for R
where
  M: Send + 'static,
  R: GetRepository<M> + PutRepository<M> + DeleteRepository + ?Sized,
{
}

#[async_trait]
impl<M, R> GetRepository<M> for Arc<R>
where
  M: Send + 'static,
  R: GetRepository<M> + ?Sized,
{
  async fn get(&self, query: &Query, operation: Operation) -> Result<M> {
    (**self).get(query, operation).await
  }

  async fn get_all(&self, query: &Query, operation: Operation) -> Result<Vec<M>> {
    (**self).get_all(query, operation).await
  }
}

#[async_trait]
impl<M, R> PutRepository<M> for Arc<R>
where
  M: Send + 'static,
  R: PutRepository<M> + ?Sized,
{
  async fn put(&self, query: &Query, value: Option<M>, operation: Operation) -> Result<M> {
    (**self).put(query, value, operation).await
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<M>>,
    operation: Operation,
  ) -> Result<Vec<M>> {
    (**self).put_all(query, values, operation).await
  }
}

#[async_trait]
impl<R> DeleteRepository for Arc<R>
where
  R: DeleteRepository + ?Sized,
{
  async fn delete(&self, query: &Query, operation: Operation) -> Result<()> {
    (**self).delete(query, operation).await
  }

  async fn delete_all(&self, query: &Query, operation: Operation) -> Result<()> {
    (**self).delete_all(query, operation).await
  }
}
