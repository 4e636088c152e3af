/// Body encoding of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
  /// `application/x-www-form-urlencoded`, params kept in order
  FormUrlEncoded(Vec<(String, String)>),
  /// `application/json` with an already serialized payload
  Json(Option<String>),
}

/// HTTP method, carrying the body encoding for methods that have one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
  Get,
  Delete,
  Post(Option<ContentType>),
  Put(Option<ContentType>),
}

impl Method {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Get => "GET",
      Self::Delete => "DELETE",
      Self::Post(_) => "POST",
      Self::Put(_) => "PUT",
    }
  }

  pub fn content_type(&self) -> Option<&ContentType> {
    match self {
      Self::Post(content_type) | Self::Put(content_type) => content_type.as_ref(),
      Self::Get | Self::Delete => None,
    }
  }
}

/// A request against a network data source, relative to a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkQuery {
  pub method: Method,
  pub path: String,
  pub url_params: Vec<(String, String)>,
  pub headers: Vec<(String, String)>,
}

impl NetworkQuery {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    Self {
      method,
      path: path.into(),
      url_params: Vec::new(),
      headers: Vec::new(),
    }
  }

  /// Append a url parameter. Parameters keep insertion order.
  pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.url_params.push((name.into(), value.into()));
    self
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Same query with a JSON body, keeping the method verb.
  ///
  /// `Get` and `Delete` have no body and are returned unchanged.
  pub fn with_json_body(mut self, payload: String) -> Self {
    self.method = match self.method {
      Method::Post(_) => Method::Post(Some(ContentType::Json(Some(payload)))),
      Method::Put(_) => Method::Put(Some(ContentType::Json(Some(payload)))),
      other => other,
    };
    self
  }

  /// Textual form identifying what this query asks for.
  ///
  /// Headers are left out: they don't change which resource is addressed.
  pub(crate) fn canonical(&self) -> String {
    let params: Vec<String> = self
      .url_params
      .iter()
      .map(|(name, value)| format!("{}={}", name, value))
      .collect();
    format!(
      "{} {}?{} {:?}",
      self.method.name(),
      self.path,
      params.join("&"),
      self.method.content_type()
    )
  }
}
