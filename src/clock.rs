//! Wall-clock source used by time-based validation.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// A duration in whole seconds.
pub type Seconds = i64;

pub trait Clock: Send + Sync {
  /// Current time, read on every call.
  fn now_millis(&self) -> Millis;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now_millis(&self) -> Millis {
    Utc::now().timestamp_millis()
  }
}

/// A clock that only moves when told to. Handy in tests.
#[derive(Debug, Default)]
pub struct FixedClock {
  now: AtomicI64,
}

impl FixedClock {
  pub fn new(now: Millis) -> Self {
    Self {
      now: AtomicI64::new(now),
    }
  }

  pub fn set(&self, now: Millis) {
    self.now.store(now, Ordering::SeqCst);
  }

  pub fn advance(&self, by: Millis) {
    self.now.fetch_add(by, Ordering::SeqCst);
  }
}

impl Clock for FixedClock {
  fn now_millis(&self) -> Millis {
    self.now.load(Ordering::SeqCst)
  }
}
