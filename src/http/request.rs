use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FetchError, Result};
use crate::platform::OnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for Method {
  type Err = FetchError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_uppercase().as_str() {
      "GET" => Ok(Method::Get),
      "POST" => Ok(Method::Post),
      "PUT" => Ok(Method::Put),
      "PATCH" => Ok(Method::Patch),
      "DELETE" => Ok(Method::Delete),
      other => Err(FetchError::InvalidArgument(format!(
        "unsupported HTTP method '{}'",
        other
      ))),
    }
  }
}

/// Request payload, kept in a serializable form so queued requests can be replayed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequestBody {
  #[default]
  Empty,
  Text(String),
  Json(serde_json::Value),
}

impl RequestBody {
  pub fn json<T: Serialize>(value: &T) -> Result<Self> {
    serde_json::to_value(value)
      .map(RequestBody::Json)
      .map_err(|e| FetchError::InvalidArgument(format!("request body is not serializable: {}", e)))
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, RequestBody::Empty)
  }
}

/// One HTTP exchange to perform.
///
/// Owned by the call that built it, or by a queue item once the request has
/// been deferred for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
  pub method: Method,
  /// Absolute URL including the query string
  pub url: String,
  #[serde(default, skip_serializing_if = "RequestBody::is_empty")]
  pub body: RequestBody,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_type: Option<String>,
  #[serde(default)]
  pub on_error: OnError,
  /// Fingerprint of the cached body, sent as a conditional header
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub fingerprint: Option<String>,
}

impl RequestSpec {
  pub fn new(method: Method, url: impl Into<String>) -> Self {
    Self {
      method,
      url: url.into(),
      body: RequestBody::Empty,
      content_type: None,
      on_error: OnError::default(),
      fingerprint: None,
    }
  }

  pub fn get(url: impl Into<String>) -> Self {
    Self::new(Method::Get, url)
  }

  pub fn body(mut self, body: RequestBody) -> Self {
    self.body = body;
    self
  }

  pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
    self.content_type = Some(content_type.into());
    self
  }

  pub fn on_error(mut self, on_error: OnError) -> Self {
    self.on_error = on_error;
    self
  }

  pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
    self.fingerprint = Some(fingerprint.into());
    self
  }

  /// Explicit type, else JSON for JSON bodies, else form encoding for non-GET.
  pub fn effective_content_type(&self) -> Option<String> {
    if let Some(ct) = &self.content_type {
      return Some(ct.clone());
    }
    match (&self.body, self.method) {
      (RequestBody::Json(_), _) => Some("application/json".to_string()),
      (_, Method::Get) => None,
      _ => Some("application/x-www-form-urlencoded".to_string()),
    }
  }

  /// Bytes to send. GET never carries a body.
  pub fn body_bytes(&self) -> Option<Vec<u8>> {
    if self.method == Method::Get {
      return None;
    }
    match &self.body {
      RequestBody::Empty => Some(Vec::new()),
      RequestBody::Text(text) => Some(text.clone().into_bytes()),
      RequestBody::Json(value) => Some(value.to_string().into_bytes()),
    }
  }
}
