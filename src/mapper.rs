//! Pure transformations between two representations of the same entity.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Converts an `In` value into an `Out` value.
///
/// Mappers are stateless and shared between repository chains, so they must
/// be `Send + Sync`. A value that can't be represented in the target shape is
/// a [`HarmonyError::Mapping`](crate::HarmonyError::Mapping) failure.
pub trait Mapper<In, Out>: Send + Sync {
  fn map(&self, from: In) -> Result<Out>;

  /// Map every element, stopping at the first failure.
  fn map_all(&self, from: Vec<In>) -> Result<Vec<Out>> {
    from.into_iter().map(|value| self.map(value)).collect()
  }
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMapper;

impl<T> Mapper<T, T> for IdentityMapper {
  fn map(&self, from: T) -> Result<T> {
    Ok(from)
  }
}

/// Adapts a closure into a [`Mapper`].
pub struct FnMapper<F>(F);

impl<F> FnMapper<F> {
  pub fn new(f: F) -> Self {
    Self(f)
  }
}

impl<In, Out, F> Mapper<In, Out> for FnMapper<F>
where
  F: Fn(In) -> Result<Out> + Send + Sync,
{
  fn map(&self, from: In) -> Result<Out> {
    (self.0)(from)
  }
}

/// Decodes a JSON document into `T`.
pub struct JsonDeserializerMapper<T> {
  _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDeserializerMapper<T> {
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }
}

impl<T> Default for JsonDeserializerMapper<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: DeserializeOwned> Mapper<String, T> for JsonDeserializerMapper<T> {
  fn map(&self, from: String) -> Result<T> {
    Ok(serde_json::from_str(&from)?)
  }
}

/// Encodes `T` as a JSON document.
pub struct JsonSerializerMapper<T> {
  _marker: PhantomData<fn(T)>,
}

impl<T> JsonSerializerMapper<T> {
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }
}

impl<T> Default for JsonSerializerMapper<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Serialize> Mapper<T, String> for JsonSerializerMapper<T> {
  fn map(&self, from: T) -> Result<String> {
    Ok(serde_json::to_string(&from)?)
  }
}
