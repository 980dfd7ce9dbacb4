//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::{FetchError, Result as FetchResult};
use crate::http::{Method, Transport, TransportFailure, TransportRequest, TransportResponse};
use crate::platform::{Clock, NetworkProbe, Notifier};
use crate::store::{MemoryStorage, Storage};

#[derive(Debug, Clone)]
pub struct RecordedRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  pub body: Option<Vec<u8>>,
}

impl RecordedRequest {
  pub fn header(&self, name: &str) -> Option<String> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.clone())
  }
}

/// Replays queued outcomes in order and records every request.
#[derive(Default)]
pub struct StubTransport {
  script: Mutex<VecDeque<Result<TransportResponse, TransportFailure>>>,
  requests: Mutex<Vec<RecordedRequest>>,
  forbidden: AtomicBool,
}

impl StubTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Panics on any request.
  pub fn forbidden() -> Self {
    let transport = Self::default();
    transport.forbidden.store(true, Ordering::SeqCst);
    transport
  }

  pub fn respond(&self, status: u16, body: &str) {
    self.script.lock().unwrap().push_back(Ok(TransportResponse {
      status,
      headers: HashMap::new(),
      body: body.as_bytes().to_vec(),
    }));
  }

  pub fn fail(&self, detail: &str) {
    self
      .script
      .lock()
      .unwrap()
      .push_back(Err(TransportFailure::new(detail)));
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn urls(&self) -> Vec<String> {
    self.requests().into_iter().map(|r| r.url).collect()
  }
}

#[async_trait]
impl Transport for StubTransport {
  async fn send(
    &self,
    request: TransportRequest,
  ) -> Result<TransportResponse, TransportFailure> {
    assert!(
      !self.forbidden.load(Ordering::SeqCst),
      "transport must not be called: {} {}",
      request.method,
      request.url
    );

    self.requests.lock().unwrap().push(RecordedRequest {
      method: request.method,
      url: request.url,
      headers: request.headers,
      body: request.body,
    });

    self
      .script
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or_else(|| Err(TransportFailure::new("no scripted response")))
  }
}

pub struct StubProbe {
  online: AtomicBool,
}

impl StubProbe {
  pub fn new(online: bool) -> Self {
    Self {
      online: AtomicBool::new(online),
    }
  }

  pub fn set_online(&self, online: bool) {
    self.online.store(online, Ordering::SeqCst);
  }
}

#[async_trait]
impl NetworkProbe for StubProbe {
  async fn is_reachable(&self) -> bool {
    self.online.load(Ordering::SeqCst)
  }
}

pub struct ManualClock {
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new() -> Self {
    Self {
      now: Mutex::new(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()),
    }
  }

  pub fn advance(&self, seconds: i64) {
    *self.now.lock().unwrap() += Duration::seconds(seconds);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock().unwrap()
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  toasts: Mutex<Vec<String>>,
  alerts: Mutex<Vec<String>>,
  busy: Mutex<Vec<bool>>,
}

impl RecordingNotifier {
  pub fn toasts(&self) -> Vec<String> {
    self.toasts.lock().unwrap().clone()
  }

  pub fn alerts(&self) -> Vec<String> {
    self.alerts.lock().unwrap().clone()
  }

  pub fn busy_events(&self) -> Vec<bool> {
    self.busy.lock().unwrap().clone()
  }
}

impl Notifier for RecordingNotifier {
  fn toast(&self, message: &str) {
    self.toasts.lock().unwrap().push(message.to_string());
  }

  fn alert(&self, message: &str) {
    self.alerts.lock().unwrap().push(message.to_string());
  }

  fn busy(&self, show: bool) {
    self.busy.lock().unwrap().push(show);
  }
}

/// In-memory storage whose reads take a couple of milliseconds, widening the
/// gap between a read and the following write.
#[derive(Default)]
pub struct SlowStorage {
  inner: MemoryStorage,
}

impl SlowStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Storage for SlowStorage {
  fn read_text(&self, namespace: &str, key: &str) -> FetchResult<Option<String>> {
    std::thread::sleep(std::time::Duration::from_millis(2));
    self.inner.read_text(namespace, key)
  }

  fn write_text(&self, namespace: &str, key: &str, text: &str) -> FetchResult<()> {
    self.inner.write_text(namespace, key, text)
  }

  fn delete(&self, namespace: &str, key: &str) -> FetchResult<bool> {
    self.inner.delete(namespace, key)
  }

  fn keys(&self, namespace: &str, prefix: &str) -> FetchResult<Vec<String>> {
    self.inner.keys(namespace, prefix)
  }

  fn clear(&self, namespace: &str) -> FetchResult<usize> {
    self.inner.clear(namespace)
  }
}

/// Storage whose reads always fail; writes are accepted and dropped.
pub struct BrokenStorage;

impl Storage for BrokenStorage {
  fn read_text(&self, _namespace: &str, _key: &str) -> FetchResult<Option<String>> {
    Err(FetchError::Storage("disk unavailable".to_string()))
  }

  fn write_text(&self, _namespace: &str, _key: &str, _text: &str) -> FetchResult<()> {
    Ok(())
  }

  fn delete(&self, _namespace: &str, _key: &str) -> FetchResult<bool> {
    Ok(false)
  }

  fn keys(&self, _namespace: &str, _prefix: &str) -> FetchResult<Vec<String>> {
    Ok(Vec::new())
  }

  fn clear(&self, _namespace: &str) -> FetchResult<usize> {
    Ok(0)
  }
}

/// Entity used across the queue, reconciler and client tests.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Task {
  pub id: u32,
  pub title: String,
}

impl Task {
  pub fn new(id: u32, title: &str) -> Self {
    Self {
      id,
      title: title.to_string(),
    }
  }
}

impl crate::queue::Identifiable for Task {
  type Id = u32;

  fn id(&self) -> u32 {
    self.id
  }

  fn entity_type() -> &'static str {
    "task"
  }
}
