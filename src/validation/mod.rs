//! Pluggable validity checks for cached entities.
//!
//! Strategies ask an entity for the capability they need through
//! [`Validatable`]. An entity lacking it makes the strategy fail with
//! [`HarmonyError::InvalidArgument`](crate::HarmonyError::InvalidArgument)
//! instead of silently answering.

mod timestamp;

use std::sync::Arc;

use crate::error::Result;

pub use timestamp::{TimestampValidationEntity, TimestampValidationStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
  Valid,
  Invalid,
}

/// An entity that validation strategies can inspect.
///
/// Each accessor exposes one optional capability; the default is "not
/// supported".
pub trait Validatable {
  fn as_timestamped(&self) -> Option<&dyn TimestampValidationEntity> {
    None
  }
}

/// Decides whether an entity is still usable.
pub trait ValidationStrategy: Send + Sync {
  fn is_valid(&self, entity: &dyn Validatable) -> Result<ValidationResult>;
}

/// Combines several strategies: valid only if every strategy says so.
///
/// Strategies run in order; the first error or `Invalid` answer wins.
#[derive(Clone, Default)]
pub struct StrategyValidator {
  strategies: Vec<Arc<dyn ValidationStrategy>>,
}

impl StrategyValidator {
  pub fn new(strategies: Vec<Arc<dyn ValidationStrategy>>) -> Self {
    Self { strategies }
  }

  pub fn with_strategy(mut self, strategy: impl ValidationStrategy + 'static) -> Self {
    self.strategies.push(Arc::new(strategy));
    self
  }
}

impl ValidationStrategy for StrategyValidator {
  fn is_valid(&self, entity: &dyn Validatable) -> Result<ValidationResult> {
    for strategy in &self.strategies {
      if strategy.is_valid(entity)? == ValidationResult::Invalid {
        return Ok(ValidationResult::Invalid);
      }
    }
    Ok(ValidationResult::Valid)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::HarmonyError;

  struct Fixed(ValidationResult);

  impl ValidationStrategy for Fixed {
    fn is_valid(&self, _entity: &dyn Validatable) -> Result<ValidationResult> {
      Ok(self.0)
    }
  }

  struct Failing;

  impl ValidationStrategy for Failing {
    fn is_valid(&self, _entity: &dyn Validatable) -> Result<ValidationResult> {
      Err(HarmonyError::InvalidArgument("unsupported".to_string()))
    }
  }

  struct Plain;

  impl Validatable for Plain {}

  #[test]
  fn test_empty_validator_is_valid() {
    assert_eq!(
      StrategyValidator::default().is_valid(&Plain).unwrap(),
      ValidationResult::Valid
    );
  }

  #[test]
  fn test_all_strategies_must_agree() {
    let validator = StrategyValidator::default()
      .with_strategy(Fixed(ValidationResult::Valid))
      .with_strategy(Fixed(ValidationResult::Invalid));
    assert_eq!(validator.is_valid(&Plain).unwrap(), ValidationResult::Invalid);
  }

  #[test]
  fn test_first_decisive_answer_wins() {
    let validator = StrategyValidator::default()
      .with_strategy(Fixed(ValidationResult::Invalid))
      .with_strategy(Failing);
    assert_eq!(validator.is_valid(&Plain).unwrap(), ValidationResult::Invalid);

    let validator = StrategyValidator::default()
      .with_strategy(Failing)
      .with_strategy(Fixed(ValidationResult::Invalid));
    assert!(matches!(
      validator.is_valid(&Plain),
      Err(HarmonyError::InvalidArgument(_))
    ));
  }
}
