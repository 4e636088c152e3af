//! Mapping from a [`NetworkQuery`] onto transport-level call parameters.

use reqwest::Method as HttpMethod;
use url::{form_urlencoded, Url};

use crate::error::{HarmonyError, Result};

use super::query::{ContentType, Method, NetworkQuery};

pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
pub const JSON: &str = "application/json";

/// Encoded request body together with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
  pub content_type: &'static str,
  pub content: String,
}

/// Everything a transport needs to perform one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
  pub method: HttpMethod,
  pub url: Url,
  pub headers: Vec<(String, String)>,
  pub body: Option<RequestBody>,
}

impl NetworkQuery {
  /// Build the transport request for this query.
  ///
  /// Per-query headers override global ones with the same (case-insensitive)
  /// name. At most one body encoding applies, chosen by the method.
  pub fn to_request(
    &self,
    base_url: &str,
    global_headers: &[(String, String)],
  ) -> Result<TransportRequest> {
    Ok(TransportRequest {
      method: self.http_method(),
      url: self.url(base_url)?,
      headers: merge_headers(global_headers, &self.headers),
      body: self.body(),
    })
  }

  /// `base_url` + sanitized path + url params.
  ///
  /// One trailing slash is removed from the base, empty path segments are
  /// dropped and the rest joined behind a single leading slash.
  pub fn url(&self, base_url: &str) -> Result<Url> {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
    let raw = format!("{}/{}", base, segments.join("/"));

    let mut url = Url::parse(&raw)
      .map_err(|e| HarmonyError::InvalidArgument(format!("invalid url {}: {}", raw, e)))?;

    if !self.url_params.is_empty() {
      url
        .query_pairs_mut()
        .extend_pairs(self.url_params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    Ok(url)
  }

  fn http_method(&self) -> HttpMethod {
    match self.method {
      Method::Get => HttpMethod::GET,
      Method::Delete => HttpMethod::DELETE,
      Method::Post(_) => HttpMethod::POST,
      Method::Put(_) => HttpMethod::PUT,
    }
  }

  fn body(&self) -> Option<RequestBody> {
    match self.method.content_type()? {
      ContentType::FormUrlEncoded(params) => {
        let content = form_urlencoded::Serializer::new(String::new())
          .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
          .finish();
        Some(RequestBody {
          content_type: FORM_URL_ENCODED,
          content,
        })
      }
      ContentType::Json(payload) => Some(RequestBody {
        content_type: JSON,
        content: payload.clone().unwrap_or_default(),
      }),
    }
  }
}

fn merge_headers(global: &[(String, String)], local: &[(String, String)]) -> Vec<(String, String)> {
  let mut merged: Vec<(String, String)> = global
    .iter()
    .filter(|(name, _)| !local.iter().any(|(l, _)| l.eq_ignore_ascii_case(name)))
    .cloned()
    .collect();
  merged.extend(local.iter().cloned());
  merged
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
  }

  #[test]
  fn test_url_strips_slashes() {
    let query = NetworkQuery::new(Method::Get, "/users/");
    let url = query.url("https://api.example.com/").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/users");
  }

  #[test]
  fn test_url_drops_empty_segments() {
    let query = NetworkQuery::new(Method::Get, "//v1///users//42/");
    let url = query.url("https://api.example.com").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/users/42");
  }

  #[test]
  fn test_url_keeps_base_path() {
    let query = NetworkQuery::new(Method::Get, "users");
    let url = query.url("https://api.example.com/api/").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/api/users");
  }

  #[test]
  fn test_url_params_in_input_order() {
    let query = NetworkQuery::new(Method::Get, "/users/")
      .with_param("sort", "name")
      .with_param("page", "2")
      .with_param("filter", "a b");
    let url = query.url("https://api.example.com/").unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.example.com/users?sort=name&page=2&filter=a+b"
    );
  }

  #[test]
  fn test_url_without_params_has_no_query() {
    let url = NetworkQuery::new(Method::Get, "/users").url("https://api.example.com").unwrap();
    assert_eq!(url.query(), None);
  }

  #[test]
  fn test_invalid_base_url() {
    let err = NetworkQuery::new(Method::Get, "/users").url("not a url").unwrap_err();
    assert!(matches!(err, HarmonyError::InvalidArgument(_)));
  }

  #[test]
  fn test_query_headers_override_global() {
    let global = vec![header("Authorization", "Bearer global"), header("Accept", "*/*")];
    let query = NetworkQuery::new(Method::Get, "/users")
      .with_header("authorization", "Bearer local")
      .with_header("X-Trace", "1");

    let request = query.to_request("https://api.example.com", &global).unwrap();
    assert_eq!(
      request.headers,
      vec![
        header("Accept", "*/*"),
        header("authorization", "Bearer local"),
        header("X-Trace", "1"),
      ]
    );
  }

  #[test]
  fn test_form_body() {
    let params = vec![header("user", "jo doe"), header("grant", "password")];
    let query = NetworkQuery::new(Method::Post(Some(ContentType::FormUrlEncoded(params))), "/token");

    let request = query.to_request("https://api.example.com", &[]).unwrap();
    assert_eq!(request.method, HttpMethod::POST);
    assert_eq!(
      request.body,
      Some(RequestBody {
        content_type: FORM_URL_ENCODED,
        content: "user=jo+doe&grant=password".to_string(),
      })
    );
  }

  #[test]
  fn test_json_body() {
    let query = NetworkQuery::new(
      Method::Put(Some(ContentType::Json(Some(r#"{"name":"jo"}"#.to_string())))),
      "/users/1",
    );
    let request = query.to_request("https://api.example.com", &[]).unwrap();
    assert_eq!(request.method, HttpMethod::PUT);
    assert_eq!(request.body.unwrap().content_type, JSON);

    let empty = NetworkQuery::new(Method::Post(Some(ContentType::Json(None))), "/ping");
    let request = empty.to_request("https://api.example.com", &[]).unwrap();
    assert_eq!(request.body.unwrap().content, "");
  }

  #[test]
  fn test_no_body_without_content_type() {
    let request = NetworkQuery::new(Method::Delete, "/users/1")
      .to_request("https://api.example.com", &[])
      .unwrap();
    assert_eq!(request.method, HttpMethod::DELETE);
    assert!(request.body.is_none());
  }
}
