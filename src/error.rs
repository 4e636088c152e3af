//! Error taxonomy shared by every repository, mapper and interactor layer.

use thiserror::Error;

use crate::operation::Operation;

/// Errors raised by data sources, mappers, validation strategies and scopes.
///
/// Decorators and interactors never translate these: an error raised by the
/// innermost repository reaches the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarmonyError {
  /// No entity matches the query
  #[error("not found: {0}")]
  NotFound(String),

  /// The input does not satisfy what the callee requires
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  /// The underlying transport failed
  #[error("transport failure: {0}")]
  Transport(String),

  /// A mapper could not represent the source value in the target shape
  #[error("mapping failure: {0}")]
  Mapping(String),

  /// The data source does not handle this query variant
  #[error("query not supported: {0}")]
  QueryNotSupported(String),

  /// The repository does not handle this operation
  #[error("operation not allowed: {0:?}")]
  OperationNotAllowed(Operation),

  /// A cached value exists but did not pass validation
  #[error("cached value is no longer valid")]
  NotValid,

  /// The local store failed
  #[error("storage failure: {0}")]
  Storage(String),

  /// The scope the call was bound to has been cancelled
  #[error("scope cancelled")]
  Cancelled,

  /// The task running the call panicked or was aborted
  #[error("task failed: {0}")]
  Task(String),
}

impl HarmonyError {
  /// True for errors that mean "nothing usable here", which cache-aware
  /// repositories treat as a miss rather than a failure.
  pub fn is_miss(&self) -> bool {
    matches!(self, Self::NotFound(_) | Self::NotValid)
  }
}

impl From<serde_json::Error> for HarmonyError {
  fn from(err: serde_json::Error) -> Self {
    Self::Mapping(err.to_string())
  }
}

impl From<reqwest::Error> for HarmonyError {
  fn from(err: reqwest::Error) -> Self {
    Self::Transport(err.to_string())
  }
}

impl From<rusqlite::Error> for HarmonyError {
  fn from(err: rusqlite::Error) -> Self {
    Self::Storage(err.to_string())
  }
}

/// Result alias used across the crate.
pub type Result<T, E = HarmonyError> = std::result::Result<T, E>;
