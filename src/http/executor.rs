//! Executes single HTTP exchanges and classifies their outcome.

use serde::{de::DeserializeOwned, Deserialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::request::RequestSpec;
use super::transport::{Transport, TransportRequest};
use crate::error::{FetchError, Result};
use crate::platform::{NetworkProbe, SessionTokenProvider};

const HTTP_ERROR_STARTING_CODE: u16 = 400;
const HTTP_NOT_MODIFIED: u16 = 304;

/// A successfully received response.
#[derive(Debug, Clone)]
pub struct Response {
  pub status: u16,
  pub headers: HashMap<String, String>,
  pub body: String,
}

/// Outcome of one exchange.
#[derive(Debug, Clone)]
pub enum SendResult {
  Ok(Response),
  /// The server confirmed the conditional fingerprint; the cached copy is valid
  NotModified,
  HttpError {
    status: u16,
    message: String,
    body: String,
  },
  NetworkUnavailable,
  TransportError(String),
}

impl SendResult {
  pub fn is_ok(&self) -> bool {
    matches!(self, SendResult::Ok(_))
  }

  /// The error this outcome represents, if it is a failure.
  pub fn error(&self) -> Option<FetchError> {
    match self {
      SendResult::Ok(_) | SendResult::NotModified => None,
      SendResult::HttpError {
        status, message, ..
      } => Some(FetchError::Http {
        status: *status,
        message: message.clone(),
      }),
      SendResult::NetworkUnavailable => Some(FetchError::NetworkUnavailable),
      SendResult::TransportError(detail) => Some(FetchError::Transport(detail.clone())),
    }
  }
}

/// Structured error payload some servers return.
#[derive(Debug, Deserialize)]
struct ServerError {
  #[serde(rename = "Message", alias = "message", default)]
  message: Option<String>,
  #[serde(rename = "ExceptionMessage", alias = "exceptionMessage", default)]
  exception_message: Option<String>,
}

/// Sends [`RequestSpec`]s through the transport. Never retries.
#[derive(Clone)]
pub struct RequestExecutor {
  transport: Arc<dyn Transport>,
  probe: Arc<dyn NetworkProbe>,
  tokens: Arc<dyn SessionTokenProvider>,
}

impl RequestExecutor {
  pub fn new(
    transport: Arc<dyn Transport>,
    probe: Arc<dyn NetworkProbe>,
    tokens: Arc<dyn SessionTokenProvider>,
  ) -> Self {
    Self {
      transport,
      probe,
      tokens,
    }
  }

  fn build(&self, spec: &RequestSpec) -> TransportRequest {
    let mut headers = Vec::new();

    if let Some(token) = self.tokens.session_token().filter(|t| !t.trim().is_empty()) {
      headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
    }
    if let Some(fingerprint) = spec.fingerprint.as_deref().filter(|f| !f.is_empty()) {
      headers.push(("If-None-Match".to_string(), format!("\"{}\"", fingerprint)));
    }

    let body = spec.body_bytes();
    if body.is_some() {
      if let Some(content_type) = spec.effective_content_type() {
        headers.push(("Content-Type".to_string(), content_type));
      }
    }

    TransportRequest {
      method: spec.method,
      url: spec.url.clone(),
      headers,
      body,
    }
  }

  pub async fn send(&self, spec: &RequestSpec) -> SendResult {
    let method = spec.method;
    let url = spec.url.as_str();

    let response = match self.transport.send(self.build(spec)).await {
      Ok(response) => response,
      Err(failure) => {
        if !self.probe.is_reachable().await {
          warn!(%method, url, error = %failure, "Network unavailable");
          return SendResult::NetworkUnavailable;
        }
        error!(%method, url, error = %failure, "Transport failure");
        return SendResult::TransportError(failure.detail);
      }
    };

    if response.status == HTTP_NOT_MODIFIED {
      debug!(%method, url, "Not modified");
      return SendResult::NotModified;
    }

    let body = String::from_utf8_lossy(&response.body).into_owned();

    if response.status >= HTTP_ERROR_STARTING_CODE {
      let message = server_error_message(response.status, &body);
      warn!(%method, url, status = response.status, server_response = %body, "Server returned an error");
      return SendResult::HttpError {
        status: response.status,
        message,
        body,
      };
    }

    debug!(%method, url, status = response.status, bytes = body.len(), "Request succeeded");
    SendResult::Ok(Response {
      status: response.status,
      headers: response.headers,
      body,
    })
  }
}

/// Human-readable message for an error response.
fn server_error_message(status: u16, body: &str) -> String {
  let generic = format!("Connection to the server failed: {}", status);
  let trimmed = body.trim();

  let mut message = if trimmed.is_empty() {
    generic
  } else if trimmed.starts_with('{') {
    serde_json::from_str::<ServerError>(trimmed)
      .ok()
      .and_then(|e| {
        e.message
          .filter(|m| !m.is_empty())
          .or(e.exception_message.filter(|m| !m.is_empty()))
      })
      .unwrap_or_else(|| trimmed.to_string())
  } else {
    trimmed.to_string()
  };

  if message.to_ascii_lowercase().starts_with("<!doctype") {
    if let Some(title) = html_title(&message) {
      message = title;
    }
  }

  if message == "Error" {
    message = "There was a problem on the server.".to_string();
  }

  message
}

fn html_title(page: &str) -> Option<String> {
  let start = page.find("<title>")? + "<title>".len();
  let end = page[start..].find("</title>")? + start;
  Some(page[start..end].trim().to_string())
}

/// Decode a response body into `T`.
///
/// An empty body decodes to `false` for `bool` and to `None` otherwise. A
/// `String` target accepts unquoted text.
pub fn extract_response<T>(body: &str) -> Result<Option<T>>
where
  T: DeserializeOwned + 'static,
{
  let decode_err = |source: serde_json::Error| FetchError::Decode {
    target: std::any::type_name::<T>(),
    source,
  };

  if body.trim().is_empty() {
    if TypeId::of::<T>() == TypeId::of::<bool>() {
      return serde_json::from_str("false").map(Some).map_err(decode_err);
    }
    return Ok(None);
  }

  if TypeId::of::<T>() == TypeId::of::<String>() && !body.starts_with('"') {
    return serde_json::from_value(serde_json::Value::String(body.to_string()))
      .map(Some)
      .map_err(decode_err);
  }

  serde_json::from_str(body).map(Some).map_err(decode_err)
}
