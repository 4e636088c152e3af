//! Decorators that translate between data-layer and domain-layer shapes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::mapper::Mapper;
use crate::operation::Operation;
use crate::query::Query;

use super::{DeleteRepository, GetRepository, PutRepository};

/// Exposes an `In` repository as an `Out` repository.
///
/// Values coming out of the inner repository go through `to_out`, values
/// handed in by the caller go through `to_in`. Deletes pass straight through.
pub struct RepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  get_repository: Arc<dyn GetRepository<In>>,
  put_repository: Arc<dyn PutRepository<In>>,
  delete_repository: Arc<dyn DeleteRepository>,
  to_out: Arc<dyn Mapper<In, Out>>,
  to_in: Arc<dyn Mapper<Out, In>>,
}

impl<In, Out> RepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  pub fn new(
    get_repository: Arc<dyn GetRepository<In>>,
    put_repository: Arc<dyn PutRepository<In>>,
    delete_repository: Arc<dyn DeleteRepository>,
    to_out: Arc<dyn Mapper<In, Out>>,
    to_in: Arc<dyn Mapper<Out, In>>,
  ) -> Self {
    Self {
      get_repository,
      put_repository,
      delete_repository,
      to_out,
      to_in,
    }
  }

  /// Wrap a single repository that has all three capabilities.
  pub fn from_repository<R>(
    repository: Arc<R>,
    to_out: impl Mapper<In, Out> + 'static,
    to_in: impl Mapper<Out, In> + 'static,
  ) -> Self
  where
    R: GetRepository<In> + PutRepository<In> + DeleteRepository + 'static,
  {
    Self::new(
      repository.clone(),
      repository.clone(),
      repository,
      Arc::new(to_out),
      Arc::new(to_in),
    )
  }
}

#[async_trait]
impl<In, Out> GetRepository<Out> for RepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn get(&self, query: &Query, operation: Operation) -> Result<Out> {
    let value = self.get_repository.get(query, operation).await?;
    self.to_out.map(value)
  }

  async fn get_all(&self, query: &Query, operation: Operation) -> Result<Vec<Out>> {
    let values = self.get_repository.get_all(query, operation).await?;
    self.to_out.map_all(values)
  }
}

#[async_trait]
impl<In, Out> PutRepository<Out> for RepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn put(&self, query: &Query, value: Option<Out>, operation: Operation) -> Result<Out> {
    put_mapped(&*self.put_repository, &*self.to_out, &*self.to_in, query, value, operation).await
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<Out>>,
    operation: Operation,
  ) -> Result<Vec<Out>> {
    put_all_mapped(&*self.put_repository, &*self.to_out, &*self.to_in, query, values, operation)
      .await
  }
}

#[async_trait]
impl<In, Out> DeleteRepository for RepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn delete(&self, query: &Query, operation: Operation) -> Result<()> {
    self.delete_repository.delete(query, operation).await
  }

  async fn delete_all(&self, query: &Query, operation: Operation) -> Result<()> {
    self.delete_repository.delete_all(query, operation).await
  }
}

/// Read-only variant of [`RepositoryMapper`].
pub struct GetRepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  get_repository: Arc<dyn GetRepository<In>>,
  to_out: Arc<dyn Mapper<In, Out>>,
}

impl<In, Out> GetRepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  pub fn new(
    get_repository: Arc<dyn GetRepository<In>>,
    to_out: impl Mapper<In, Out> + 'static,
  ) -> Self {
    Self {
      get_repository,
      to_out: Arc::new(to_out),
    }
  }
}

#[async_trait]
impl<In, Out> GetRepository<Out> for GetRepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn get(&self, query: &Query, operation: Operation) -> Result<Out> {
    let value = self.get_repository.get(query, operation).await?;
    self.to_out.map(value)
  }

  async fn get_all(&self, query: &Query, operation: Operation) -> Result<Vec<Out>> {
    let values = self.get_repository.get_all(query, operation).await?;
    self.to_out.map_all(values)
  }
}

/// Write-only variant of [`RepositoryMapper`].
pub struct PutRepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  put_repository: Arc<dyn PutRepository<In>>,
  to_out: Arc<dyn Mapper<In, Out>>,
  to_in: Arc<dyn Mapper<Out, In>>,
}

impl<In, Out> PutRepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  pub fn new(
    put_repository: Arc<dyn PutRepository<In>>,
    to_out: impl Mapper<In, Out> + 'static,
    to_in: impl Mapper<Out, In> + 'static,
  ) -> Self {
    Self {
      put_repository,
      to_out: Arc::new(to_out),
      to_in: Arc::new(to_in),
    }
  }
}

#[async_trait]
impl<In, Out> PutRepository<Out> for PutRepositoryMapper<In, Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  async fn put(&self, query: &Query, value: Option<Out>, operation: Operation) -> Result<Out> {
    put_mapped(&*self.put_repository, &*self.to_out, &*self.to_in, query, value, operation).await
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<Out>>,
    operation: Operation,
  ) -> Result<Vec<Out>> {
    put_all_mapped(&*self.put_repository, &*self.to_out, &*self.to_in, query, values, operation)
      .await
  }
}

async fn put_mapped<In, Out>(
  repository: &dyn PutRepository<In>,
  to_out: &dyn Mapper<In, Out>,
  to_in: &dyn Mapper<Out, In>,
  query: &Query,
  value: Option<Out>,
  operation: Operation,
) -> Result<Out>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  // `None` stays `None`: the inner store decides what an absent value means
  let mapped = value.map(|v| to_in.map(v)).transpose()?;
  let stored = repository.put(query, mapped, operation).await?;
  to_out.map(stored)
}

async fn put_all_mapped<In, Out>(
  repository: &dyn PutRepository<In>,
  to_out: &dyn Mapper<In, Out>,
  to_in: &dyn Mapper<Out, In>,
  query: &Query,
  values: Option<Vec<Out>>,
  operation: Operation,
) -> Result<Vec<Out>>
where
  In: Send + 'static,
  Out: Send + 'static,
{
  let mapped = values.map(|v| to_in.map_all(v)).transpose()?;
  let stored = repository.put_all(query, mapped, operation).await?;
  to_out.map_all(stored)
}
