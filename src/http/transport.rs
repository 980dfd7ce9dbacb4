//! Transport abstraction and the reqwest implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use super::request::Method;

/// Wire-level request handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: u16,
  pub headers: HashMap<String, String>,
  pub body: Vec<u8>,
}

/// Connection-level failure (refused, DNS, timeout, TLS). No response was received.
#[derive(Error, Debug, Clone)]
#[error("{detail}")]
pub struct TransportFailure {
  pub detail: String,
}

impl TransportFailure {
  pub fn new(detail: impl Into<String>) -> Self {
    Self {
      detail: detail.into(),
    }
  }
}

/// Sends one HTTP exchange. Timeouts are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: TransportRequest)
    -> Result<TransportResponse, TransportFailure>;
}

/// Reqwest-based transport.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportFailure> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .connect_timeout(timeout.min(Duration::from_secs(10)))
      .user_agent(user_agent)
      .build()
      .map_err(|e| TransportFailure::new(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }

  pub fn with_client(client: reqwest::Client) -> Self {
    Self { client }
  }

  fn convert_method(method: Method) -> reqwest::Method {
    match method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
      Method::Put => reqwest::Method::PUT,
      Method::Patch => reqwest::Method::PATCH,
      Method::Delete => reqwest::Method::DELETE,
    }
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(
    &self,
    request: TransportRequest,
  ) -> Result<TransportResponse, TransportFailure> {
    let mut builder = self
      .client
      .request(Self::convert_method(request.method), &request.url);

    for (name, value) in request.headers {
      builder = builder.header(name, value);
    }
    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder.send().await.map_err(|e| {
      if e.is_timeout() {
        TransportFailure::new("Request timed out")
      } else if e.is_connect() {
        TransportFailure::new(format!("Connection failed: {}", e))
      } else {
        TransportFailure::new(e.to_string())
      }
    })?;

    let status = response.status().as_u16();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| TransportFailure::new(format!("Failed to read response body: {}", e)))?;

    Ok(TransportResponse {
      status,
      headers,
      body: body.to_vec(),
    })
  }
}
