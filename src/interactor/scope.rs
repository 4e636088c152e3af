//! Execution context interactors are bound to.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::error::{HarmonyError, Result};

/// Receives failures of detached tasks, which have no caller to return to.
pub type ErrorHandler = Arc<dyn Fn(&HarmonyError) + Send + Sync>;

/// A tokio runtime handle plus a cancellation switch.
///
/// Cloning a scope yields another handle to the same context: cancelling
/// any clone cancels them all.
#[derive(Clone)]
pub struct Scope {
  inner: Arc<ScopeInner>,
}

struct ScopeInner {
  name: String,
  handle: Handle,
  cancelled: watch::Sender<bool>,
  error_handler: Option<ErrorHandler>,
}

impl Scope {
  /// Bind to the runtime the caller is running on.
  ///
  /// # Panics
  ///
  /// Panics when called outside a tokio runtime.
  pub fn current() -> Self {
    Self::new(Handle::current())
  }

  pub fn new(handle: Handle) -> Self {
    let (cancelled, _) = watch::channel(false);
    Self {
      inner: Arc::new(ScopeInner {
        name: "default".to_string(),
        handle,
        cancelled,
        error_handler: None,
      }),
    }
  }

  /// Name used in logs.
  pub fn named(self, name: impl Into<String>) -> Self {
    self.rebuild(|inner| inner.name = name.into())
  }

  /// Route failures of fire-and-forget tasks to `handler`.
  pub fn with_error_handler(self, handler: impl Fn(&HarmonyError) + Send + Sync + 'static) -> Self {
    self.rebuild(|inner| inner.error_handler = Some(Arc::new(handler)))
  }

  fn rebuild(self, configure: impl FnOnce(&mut ScopeInner)) -> Self {
    let mut inner = ScopeInner {
      name: self.inner.name.clone(),
      handle: self.inner.handle.clone(),
      cancelled: watch::channel(*self.inner.cancelled.borrow()).0,
      error_handler: self.inner.error_handler.clone(),
    };
    configure(&mut inner);
    Self {
      inner: Arc::new(inner),
    }
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// Cancel every outstanding call and detached task on this scope.
  ///
  /// Later invocations fail with [`HarmonyError::Cancelled`].
  pub fn cancel(&self) {
    debug!(scope = %self.inner.name, "cancelling scope");
    self.inner.cancelled.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.inner.cancelled.borrow()
  }

  /// Run `work` as a task on this scope and wait for its result.
  ///
  /// The task is aborted when the scope is cancelled or when the returned
  /// future is dropped.
  pub(crate) async fn run<T, F>(&self, work: F) -> Result<T>
  where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
  {
    if self.is_cancelled() {
      return Err(HarmonyError::Cancelled);
    }

    let cancelled = self.inner.cancelled.subscribe();
    let task = self.inner.handle.spawn(work);
    let _guard = AbortOnDrop(task.abort_handle());

    tokio::select! {
      biased;
      _ = wait_cancelled(cancelled) => Err(HarmonyError::Cancelled),
      joined = task => match joined {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(HarmonyError::Cancelled),
        Err(e) => Err(HarmonyError::Task(e.to_string())),
      },
    }
  }

  /// Spawn `work` without waiting for it. The task handle is dropped.
  ///
  /// Failures go to the error handler and the log; the caller never sees
  /// them. On a cancelled scope `work` is dropped without being polled.
  pub(crate) fn launch<F>(&self, label: &'static str, work: F)
  where
    F: Future<Output = Result<()>> + Send + 'static,
  {
    if self.is_cancelled() {
      debug!(scope = %self.inner.name, task = label, "scope cancelled, detached task dropped");
      return;
    }

    let scope = self.clone();
    let cancelled = self.inner.cancelled.subscribe();

    self.inner.handle.spawn(async move {
      tokio::select! {
        biased;
        _ = wait_cancelled(cancelled) => {
          debug!(scope = %scope.inner.name, task = label, "detached task cancelled");
        }
        result = work => {
          if let Err(err) = result {
            scope.report(label, &err);
          }
        }
      }
    });
  }

  fn report(&self, label: &str, err: &HarmonyError) {
    warn!(scope = %self.inner.name, task = label, error = %err, "detached task failed");
    if let Some(handler) = &self.inner.error_handler {
      handler(err);
    }
  }
}

impl fmt::Debug for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Scope")
      .field("name", &self.inner.name)
      .field("cancelled", &self.is_cancelled())
      .finish()
  }
}

/// Resolves once the scope is cancelled. Never resolves if the scope is gone.
async fn wait_cancelled(mut cancelled: watch::Receiver<bool>) {
  loop {
    if *cancelled.borrow_and_update() {
      return;
    }
    if cancelled.changed().await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
  fn drop(&mut self) {
    self.0.abort();
  }
}
