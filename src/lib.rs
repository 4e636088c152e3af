//! Building blocks for decoupling domain logic from data sources.
//!
//! Data access is split into capabilities ([`GetRepository`],
//! [`PutRepository`], [`DeleteRepository`]) driven by [`Query`] descriptors
//! and [`Operation`] tags. Repositories compose: [`RepositoryMapper`]
//! translates shapes, [`CacheRepository`] pairs a main source with a cache
//! checked by a [`ValidationStrategy`]. Interactors bind one capability to a
//! [`Scope`] so callers never touch the data layer directly.

pub mod clock;
pub mod config;
pub mod datasource;
pub mod error;
pub mod interactor;
pub mod mapper;
pub mod network;
pub mod operation;
pub mod query;
pub mod repository;
pub mod response;
pub mod validation;

pub use error::{HarmonyError, Result};
pub use interactor::{
  DeleteAllInteractor, DeleteInteractor, DeleteRepositoryExt, GetAllInteractor, GetInteractor,
  GetRepositoryExt, PutAllInteractor, PutInteractor, PutRepositoryExt, Scope,
};
pub use mapper::Mapper;
pub use operation::Operation;
pub use query::{Key, Query};
pub use repository::{
  CacheRepository, DeleteRepository, GetRepository, PutRepository, Repository, RepositoryMapper,
};
pub use validation::{Validatable, ValidationResult, ValidationStrategy};
