use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{HarmonyError, Result};
use crate::network::{ContentType, HttpTransport, NetworkQuery};
use crate::operation::Operation;
use crate::query::Query;
use crate::repository::{DeleteRepository, GetRepository, PutRepository};

const NAME: &str = "NetworkDataSource";

/// Data source talking to a remote API through an [`HttpTransport`].
///
/// Only [`Query::Network`] is understood. Values are raw response bodies;
/// decoding belongs to a mapper such as
/// [`JsonDeserializerMapper`](crate::mapper::JsonDeserializerMapper).
pub struct NetworkDataSource {
  transport: Arc<dyn HttpTransport>,
  base_url: String,
  global_headers: Vec<(String, String)>,
}

impl NetworkDataSource {
  pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
    Self {
      transport,
      base_url: base_url.into(),
      global_headers: Vec::new(),
    }
  }

  /// Headers sent with every request unless the query overrides them.
  pub fn with_headers(mut self, headers: Vec<(String, String)>) -> Self {
    self.global_headers = headers;
    self
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  async fn send(&self, query: &NetworkQuery) -> Result<String> {
    let request = query.to_request(&self.base_url, &self.global_headers)?;
    debug!(method = query.method.name(), path = %query.path, "network data source call");
    self.transport.request(request).await
  }
}

fn network_query<'a>(query: &'a Query) -> Result<&'a NetworkQuery> {
  match query {
    Query::Network(network) => Ok(network),
    other => Err(other.unsupported(NAME)),
  }
}

/// The query with `payload` as JSON body, unless it already carries one.
fn with_payload(query: &NetworkQuery, payload: Option<String>) -> NetworkQuery {
  let Some(payload) = payload else {
    return query.clone();
  };
  match query.method.content_type() {
    None | Some(ContentType::Json(None)) => query.clone().with_json_body(payload),
    Some(_) => query.clone(),
  }
}

fn split_array(body: &str) -> Result<Vec<String>> {
  match serde_json::from_str::<Value>(body)? {
    Value::Array(items) => Ok(items.iter().map(Value::to_string).collect()),
    other => Err(HarmonyError::Mapping(format!(
      "expected a JSON array, got {}",
      json_kind(&other)
    ))),
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[async_trait]
impl GetRepository<String> for NetworkDataSource {
  async fn get(&self, query: &Query, _operation: Operation) -> Result<String> {
    self.send(network_query(query)?).await
  }

  /// Splits a JSON array response into one serialized element per entry.
  async fn get_all(&self, query: &Query, _operation: Operation) -> Result<Vec<String>> {
    let body = self.send(network_query(query)?).await?;
    split_array(&body)
  }
}

#[async_trait]
impl PutRepository<String> for NetworkDataSource {
  async fn put(&self, query: &Query, value: Option<String>, _operation: Operation) -> Result<String> {
    let query = with_payload(network_query(query)?, value);
    self.send(&query).await
  }

  async fn put_all(
    &self,
    query: &Query,
    values: Option<Vec<String>>,
    _operation: Operation,
  ) -> Result<Vec<String>> {
    let payload = values.map(|values| format!("[{}]", values.join(",")));
    let query = with_payload(network_query(query)?, payload);
    let body = self.send(&query).await?;
    split_array(&body)
  }
}

#[async_trait]
impl DeleteRepository for NetworkDataSource {
  async fn delete(&self, query: &Query, _operation: Operation) -> Result<()> {
    self.send(network_query(query)?).await.map(|_| ())
  }

  async fn delete_all(&self, query: &Query, _operation: Operation) -> Result<()> {
    self.send(network_query(query)?).await.map(|_| ())
  }
}
