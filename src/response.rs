//! Raw HTTP responses as cacheable, expiring entities.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, Millis, Seconds};
use crate::error::Result;
use crate::mapper::Mapper;
use crate::validation::{TimestampValidationEntity, Validatable};

/// A response body stamped with the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
  pub body: String,
  pub fetched_at: Millis,
  pub expire_in: Seconds,
}

impl TimestampValidationEntity for CachedResponse {
  fn last_updated_at(&self) -> Millis {
    self.fetched_at
  }

  fn expire_in(&self) -> Seconds {
    self.expire_in
  }
}

impl Validatable for CachedResponse {
  fn as_timestamped(&self) -> Option<&dyn TimestampValidationEntity> {
    Some(self)
  }
}

/// Wraps a freshly fetched body into a [`CachedResponse`] dated "now".
pub struct ResponseStamper {
  clock: Arc<dyn Clock>,
  expire_in: Seconds,
}

impl ResponseStamper {
  pub fn new(clock: Arc<dyn Clock>, expire_in: Seconds) -> Self {
    Self { clock, expire_in }
  }
}

impl Mapper<String, CachedResponse> for ResponseStamper {
  fn map(&self, body: String) -> Result<CachedResponse> {
    Ok(CachedResponse {
      body,
      fetched_at: self.clock.now_millis(),
      expire_in: self.expire_in,
    })
  }
}

/// Unwraps the body, dropping the timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseBody;

impl Mapper<CachedResponse, String> for ResponseBody {
  fn map(&self, response: CachedResponse) -> Result<String> {
    Ok(response.body)
  }
}
