use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use tracing::debug;

use crate::error::{HarmonyError, Result};

use super::request::TransportRequest;

/// Capability that performs an HTTP call and returns the response body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
  async fn request(&self, request: TransportRequest) -> Result<String>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("harmony/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client })
  }

  /// Use an already configured client (timeouts, proxies, ...).
  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
  async fn request(&self, request: TransportRequest) -> Result<String> {
    let TransportRequest {
      method,
      url,
      headers,
      body,
    } = request;
    let target = format!("{} {}", method, url);
    debug!(request = %target, "sending request");

    let mut builder = self.client.request(method, url);
    for (name, value) in &headers {
      builder = builder.header(name, value);
    }
    if let Some(body) = body {
      builder = builder.header(CONTENT_TYPE, body.content_type).body(body.content);
    }

    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;

    match status {
      s if s.is_success() => Ok(text),
      StatusCode::NOT_FOUND => Err(HarmonyError::NotFound(target)),
      s => Err(HarmonyError::Transport(format!("{} returned {}", target, s))),
    }
  }
}
