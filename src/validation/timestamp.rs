use std::sync::Arc;

use crate::clock::{Clock, Millis, Seconds, SystemClock};
use crate::error::{HarmonyError, Result};

use super::{Validatable, ValidationResult, ValidationStrategy};

const MILLIS_IN_SECOND: i64 = 1_000;

/// Capability required by [`TimestampValidationStrategy`].
pub trait TimestampValidationEntity {
  /// When the entity was last refreshed
  fn last_updated_at(&self) -> Millis;

  /// How long the entity stays valid after `last_updated_at`
  fn expire_in(&self) -> Seconds;
}

/// Valid while fewer than `expire_in` whole seconds have passed since
/// `last_updated_at`.
///
/// A `last_updated_at` in the future counts as valid.
#[derive(Clone)]
pub struct TimestampValidationStrategy {
  clock: Arc<dyn Clock>,
}

impl TimestampValidationStrategy {
  pub fn new() -> Self {
    Self::with_clock(Arc::new(SystemClock))
  }

  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self { clock }
  }
}

impl Default for TimestampValidationStrategy {
  fn default() -> Self {
    Self::new()
  }
}

impl ValidationStrategy for TimestampValidationStrategy {
  fn is_valid(&self, entity: &dyn Validatable) -> Result<ValidationResult> {
    let entity = entity.as_timestamped().ok_or_else(|| {
      HarmonyError::InvalidArgument(
        "entity does not expose last_updated_at and expire_in".to_string(),
      )
    })?;

    let now = self.clock.now_millis();
    let elapsed = now.saturating_sub(entity.last_updated_at()) / MILLIS_IN_SECOND;

    if elapsed < entity.expire_in() {
      Ok(ValidationResult::Valid)
    } else {
      Ok(ValidationResult::Invalid)
    }
  }
}
