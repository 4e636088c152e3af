//! Interactors: one repository capability bound to one [`Scope`].
//!
//! The same repository can back several interactors living on different
//! scopes, e.g. a dedicated I/O runtime and the UI runtime.
//!
//! # Example
//!
//! ```ignore
//! let users = Arc::new(InMemoryDataSource::<User>::new());
//! let get_user = users.clone().to_get_interactor(Scope::current());
//! let user = get_user.execute("ada", Operation::Default).await?;
//! ```

mod scope;

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::operation::Operation;
use crate::query::{Key, Query};
use crate::repository::{DeleteRepository, GetRepository, PutRepository};

pub use scope::{ErrorHandler, Scope};

/// Fetch one entity.
pub struct GetInteractor<M: Send + 'static> {
  scope: Scope,
  repository: Arc<dyn GetRepository<M>>,
}

impl<M: Send + 'static> GetInteractor<M> {
  pub fn new(scope: Scope, repository: Arc<dyn GetRepository<M>>) -> Self {
    Self { scope, repository }
  }

  pub async fn invoke(&self, query: Query, operation: Operation) -> Result<M> {
    debug!(scope = self.scope.name(), query = query.kind(), ?operation, "get");
    let repository = self.repository.clone();
    self
      .scope
      .run(async move { repository.get(&query, operation).await })
      .await
  }

  /// Shorthand for `invoke(Query::Id(id), operation)`.
  pub async fn execute(&self, id: impl Into<Key>, operation: Operation) -> Result<M> {
    self.invoke(Query::Id(id.into()), operation).await
  }
}

/// Fetch a list of entities.
pub struct GetAllInteractor<M: Send + 'static> {
  scope: Scope,
  repository: Arc<dyn GetRepository<M>>,
}

impl<M: Send + 'static> GetAllInteractor<M> {
  pub fn new(scope: Scope, repository: Arc<dyn GetRepository<M>>) -> Self {
    Self { scope, repository }
  }

  pub async fn invoke(&self, query: Query, operation: Operation) -> Result<Vec<M>> {
    debug!(scope = self.scope.name(), query = query.kind(), ?operation, "get_all");
    let repository = self.repository.clone();
    self
      .scope
      .run(async move { repository.get_all(&query, operation).await })
      .await
  }

  /// Shorthand for `invoke(Query::Ids(ids), operation)`.
  pub async fn execute<K: Into<Key>>(
    &self,
    ids: impl IntoIterator<Item = K>,
    operation: Operation,
  ) -> Result<Vec<M>> {
    self.invoke(Query::ids(ids), operation).await
  }
}

/// Store one entity.
pub struct PutInteractor<M: Send + 'static> {
  scope: Scope,
  repository: Arc<dyn PutRepository<M>>,
}

impl<M: Send + 'static> PutInteractor<M> {
  pub fn new(scope: Scope, repository: Arc<dyn PutRepository<M>>) -> Self {
    Self { scope, repository }
  }

  pub async fn invoke(&self, value: Option<M>, query: Query, operation: Operation) -> Result<M> {
    debug!(scope = self.scope.name(), query = query.kind(), ?operation, "put");
    let repository = self.repository.clone();
    self
      .scope
      .run(async move { repository.put(&query, value, operation).await })
      .await
  }

  /// Shorthand for `invoke(value, Query::Id(id), operation)`.
  pub async fn execute(
    &self,
    id: impl Into<Key>,
    value: Option<M>,
    operation: Operation,
  ) -> Result<M> {
    self.invoke(value, Query::Id(id.into()), operation).await
  }
}

/// Store a list of entities.
pub struct PutAllInteractor<M: Send + 'static> {
  scope: Scope,
  repository: Arc<dyn PutRepository<M>>,
}

impl<M: Send + 'static> PutAllInteractor<M> {
  pub fn new(scope: Scope, repository: Arc<dyn PutRepository<M>>) -> Self {
    Self { scope, repository }
  }

  pub async fn invoke(
    &self,
    values: Option<Vec<M>>,
    query: Query,
    operation: Operation,
  ) -> Result<Vec<M>> {
    debug!(scope = self.scope.name(), query = query.kind(), ?operation, "put_all");
    let repository = self.repository.clone();
    self
      .scope
      .run(async move { repository.put_all(&query, values, operation).await })
      .await
  }

  /// Shorthand for `invoke(values, Query::Ids(ids), operation)`.
  pub async fn execute<K: Into<Key>>(
    &self,
    ids: impl IntoIterator<Item = K>,
    values: Option<Vec<M>>,
    operation: Operation,
  ) -> Result<Vec<M>> {
    self.invoke(values, Query::ids(ids), operation).await
  }
}

/// Delete one entity without waiting for the outcome.
pub struct DeleteInteractor {
  scope: Scope,
  repository: Arc<dyn DeleteRepository>,
}

impl DeleteInteractor {
  pub fn new(scope: Scope, repository: Arc<dyn DeleteRepository>) -> Self {
    Self { scope, repository }
  }

  /// Schedule the delete on the bound scope and return immediately.
  ///
  /// Failures are only visible through the scope's error handler.
  pub fn invoke(&self, query: Query, operation: Operation) {
    debug!(scope = self.scope.name(), query = query.kind(), ?operation, "delete");
    let repository = self.repository.clone();
    self.scope.launch("delete", async move {
      repository.delete(&query, operation).await
    });
  }

  /// Shorthand for `invoke(Query::Id(id), operation)`.
  pub fn execute(&self, id: impl Into<Key>, operation: Operation) {
    self.invoke(Query::Id(id.into()), operation)
  }
}

/// Delete a set of entities without waiting for the outcome.
pub struct DeleteAllInteractor {
  scope: Scope,
  repository: Arc<dyn DeleteRepository>,
}

impl DeleteAllInteractor {
  pub fn new(scope: Scope, repository: Arc<dyn DeleteRepository>) -> Self {
    Self { scope, repository }
  }

  /// Schedule the delete on the bound scope and return immediately.
  pub fn invoke(&self, query: Query, operation: Operation) {
    debug!(scope = self.scope.name(), query = query.kind(), ?operation, "delete_all");
    let repository = self.repository.clone();
    self.scope.launch("delete_all", async move {
      repository.delete_all(&query, operation).await
    });
  }

  /// Shorthand for `invoke(Query::Ids(ids), operation)`.
  pub fn execute<K: Into<Key>>(&self, ids: impl IntoIterator<Item = K>, operation: Operation) {
    self.invoke(Query::ids(ids), operation)
  }
}

/// Builds read interactors straight from a shared repository.
pub trait GetRepositoryExt<M: Send + 'static> {
  fn to_get_interactor(&self, scope: Scope) -> GetInteractor<M>;
  fn to_get_all_interactor(&self, scope: Scope) -> GetAllInteractor<M>;
}

impl<M, R> GetRepositoryExt<M> for Arc<R>
where
  M: Send + 'static,
  R: GetRepository<M> + 'static,
{
  fn to_get_interactor(&self, scope: Scope) -> GetInteractor<M> {
    GetInteractor::new(scope, self.clone())
  }

  fn to_get_all_interactor(&self, scope: Scope) -> GetAllInteractor<M> {
    GetAllInteractor::new(scope, self.clone())
  }
}

/// Builds write interactors straight from a shared repository.
pub trait PutRepositoryExt<M: Send + 'static> {
  fn to_put_interactor(&self, scope: Scope) -> PutInteractor<M>;
  fn to_put_all_interactor(&self, scope: Scope) -> PutAllInteractor<M>;
}

impl<M, R> PutRepositoryExt<M> for Arc<R>
where
  M: Send + 'static,
  R: PutRepository<M> + 'static,
{
  fn to_put_interactor(&self, scope: Scope) -> PutInteractor<M> {
    PutInteractor::new(scope, self.clone())
  }

  fn to_put_all_interactor(&self, scope: Scope) -> PutAllInteractor<M> {
    PutAllInteractor::new(scope, self.clone())
  }
}

/// Builds delete interactors straight from a shared repository.
pub trait DeleteRepositoryExt {
  fn to_delete_interactor(&self, scope: Scope) -> DeleteInteractor;
  fn to_delete_all_interactor(&self, scope: Scope) -> DeleteAllInteractor;
}

impl<R> DeleteRepositoryExt for Arc<R>
where
  R: DeleteRepository + 'static,
{
  fn to_delete_interactor(&self, scope: Scope) -> DeleteInteractor {
    DeleteInteractor::new(scope, self.clone())
  }

  fn to_delete_all_interactor(&self, scope: Scope) -> DeleteAllInteractor {
    DeleteAllInteractor::new(scope, self.clone())
  }
}
