//! Public facade over the cache, executor and offline queue.

use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};
use url::Url;

use crate::cache::{
  CachePolicy, CachePolicyEngine, CacheReconciler, ConditionalRefresher, OnUpdate, ResponseCache,
};
use crate::error::{FetchError, Result};
use crate::http::url::{ensure_trailing_slash, resolve, with_query};
use crate::http::{
  extract_response, Method, Query, RequestBody, RequestExecutor, RequestSpec, SendResult,
  Transport,
};
use crate::platform::{
  Clock, LogNotifier, NetworkProbe, Notifier, OnError, SessionTokenProvider, StoredTokenProvider,
  SystemClock, TcpProbe,
};
use crate::queue::{DrainReport, Identifiable, OfflineQueue, QueueItem};
use crate::store::{EntryStore, Storage};

pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(50);
const DEFAULT_PROBE_ADDRESS: ([u8; 4], u16) = ([1, 1, 1, 1], 53);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of an entity mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
  /// The server accepted the request; carries the decoded response, if any
  Applied(Option<T>),
  /// The device was offline; the request was queued and cached collections patched
  Queued,
  /// The failure was handed to the error policy and did not propagate
  Failed,
}

impl<T> Mutation<T> {
  /// Applied or queued.
  pub fn succeeded(&self) -> bool {
    !matches!(self, Mutation::Failed)
  }
}

/// Collaborators and settings for an [`ApiClient`].
pub struct ApiClientBuilder {
  transport: Arc<dyn Transport>,
  storage: Arc<dyn Storage>,
  probe: Option<Arc<dyn NetworkProbe>>,
  tokens: Option<Arc<dyn SessionTokenProvider>>,
  notifier: Option<Arc<dyn Notifier>>,
  clock: Option<Arc<dyn Clock>>,
  base_url: Option<Url>,
  refresh_delay: Duration,
  show_busy: bool,
  trailing_slash: bool,
}

impl ApiClientBuilder {
  pub fn probe(mut self, probe: Arc<dyn NetworkProbe>) -> Self {
    self.probe = Some(probe);
    self
  }

  pub fn session_tokens(mut self, tokens: Arc<dyn SessionTokenProvider>) -> Self {
    self.tokens = Some(tokens);
    self
  }

  pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
    self.notifier = Some(notifier);
    self
  }

  pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = Some(clock);
    self
  }

  /// Base for relative URLs.
  pub fn base_url(mut self, base_url: Url) -> Self {
    self.base_url = Some(base_url);
    self
  }

  /// Pause before a background revalidation starts.
  pub fn refresh_delay(mut self, delay: Duration) -> Self {
    self.refresh_delay = delay;
    self
  }

  /// Whether mutations toggle the busy indicator.
  pub fn show_busy(mut self, show_busy: bool) -> Self {
    self.show_busy = show_busy;
    self
  }

  /// Append `/` to request URLs that carry no query string.
  pub fn ensure_trailing_slash(mut self, enabled: bool) -> Self {
    self.trailing_slash = enabled;
    self
  }

  pub fn build(self) -> ApiClient {
    let probe = self.probe.unwrap_or_else(|| {
      Arc::new(TcpProbe::new(
        SocketAddr::from(DEFAULT_PROBE_ADDRESS),
        DEFAULT_PROBE_TIMEOUT,
      ))
    });
    let tokens = self
      .tokens
      .unwrap_or_else(|| Arc::new(StoredTokenProvider::new(StoredTokenProvider::default_file())));
    let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
    let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

    let store = EntryStore::new(self.storage);
    let cache = ResponseCache::new(store.clone());
    let executor = RequestExecutor::new(self.transport, probe, tokens);
    let refresher = ConditionalRefresher::new(cache.clone(), executor.clone(), self.refresh_delay);

    ApiClient {
      base_url: self.base_url,
      engine: CachePolicyEngine::new(cache.clone(), executor.clone(), refresher, notifier.clone()),
      reconciler: CacheReconciler::new(cache.clone()),
      queue: OfflineQueue::new(store, clock),
      cache,
      executor,
      notifier,
      show_busy: self.show_busy,
      trailing_slash: self.trailing_slash,
    }
  }
}

/// Clears the busy indicator on every exit path.
struct BusyGuard<'a> {
  notifier: Option<&'a dyn Notifier>,
}

impl<'a> BusyGuard<'a> {
  fn show(notifier: &'a dyn Notifier, enabled: bool) -> Self {
    if enabled {
      notifier.busy(true);
    }
    Self {
      notifier: enabled.then_some(notifier),
    }
  }
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    if let Some(notifier) = self.notifier {
      notifier.busy(false);
    }
  }
}

/// Entry point for reads, writes and queue maintenance.
#[derive(Clone)]
pub struct ApiClient {
  base_url: Option<Url>,
  cache: ResponseCache,
  executor: RequestExecutor,
  engine: CachePolicyEngine,
  reconciler: CacheReconciler,
  queue: OfflineQueue,
  notifier: Arc<dyn Notifier>,
  show_busy: bool,
  trailing_slash: bool,
}

impl ApiClient {
  pub fn builder(transport: Arc<dyn Transport>, storage: Arc<dyn Storage>) -> ApiClientBuilder {
    ApiClientBuilder {
      transport,
      storage,
      probe: None,
      tokens: None,
      notifier: None,
      clock: None,
      base_url: None,
      refresh_delay: DEFAULT_REFRESH_DELAY,
      show_busy: true,
      trailing_slash: false,
    }
  }

  /// Absolute request URL with `query` merged in.
  fn target(&self, url: &str, query: &Query) -> Result<String> {
    let url = with_query(&resolve(self.base_url.as_ref(), url)?, query);
    Ok(if self.trailing_slash {
      ensure_trailing_slash(url)
    } else {
      url
    })
  }

  /// Read `url` as `T` under `policy`, reporting failures as toasts.
  pub async fn fetch<T>(
    &self,
    type_tag: &str,
    url: &str,
    query: &Query,
    policy: CachePolicy,
    on_update: Option<OnUpdate<T>>,
  ) -> Result<Option<T>>
  where
    T: DeserializeOwned + Send + 'static,
  {
    self
      .fetch_with(type_tag, url, query, policy, on_update, OnError::Toast)
      .await
  }

  /// [`ApiClient::fetch`] with an explicit error policy.
  pub async fn fetch_with<T>(
    &self,
    type_tag: &str,
    url: &str,
    query: &Query,
    policy: CachePolicy,
    on_update: Option<OnUpdate<T>>,
    on_error: OnError,
  ) -> Result<Option<T>>
  where
    T: DeserializeOwned + Send + 'static,
  {
    let url = self.target(url, query)?;
    self
      .engine
      .fetch(type_tag, &url, &Query::None, policy, on_update, on_error)
      .await
  }

  /// Read a collection of `E`, cached in the entity's own bucket so that
  /// offline mutations of `E` are reconciled into it.
  pub async fn fetch_list<E: Identifiable>(
    &self,
    url: &str,
    query: &Query,
    policy: CachePolicy,
    on_update: Option<OnUpdate<Vec<E>>>,
  ) -> Result<Option<Vec<E>>> {
    self
      .fetch(E::entity_type(), url, query, policy, on_update)
      .await
  }

  fn mutation_spec(
    &self,
    url: &str,
    method: Method,
    body: RequestBody,
    on_error: OnError,
  ) -> Result<RequestSpec> {
    if method == Method::Get {
      return Err(FetchError::InvalidArgument(
        "GET is not a mutation; use fetch".to_string(),
      ));
    }
    Ok(RequestSpec::new(method, self.target(url, &Query::None)?).body(body).on_error(on_error))
  }

  /// [`ApiClient::mutate`] with an explicit content type.
  pub async fn mutate_with_content_type(
    &self,
    url: &str,
    method: Method,
    body: RequestBody,
    content_type: Option<String>,
    on_error: OnError,
  ) -> Result<bool> {
    let mut spec = self.mutation_spec(url, method, body, on_error)?;
    spec.content_type = content_type;
    self.send_mutation(spec).await
  }

  /// Send a write that has no entity to queue. Returns whether it was accepted.
  ///
  /// Being offline is reported like any other failure.
  pub async fn mutate(
    &self,
    url: &str,
    method: Method,
    body: RequestBody,
    on_error: OnError,
  ) -> Result<bool> {
    self
      .mutate_with_content_type(url, method, body, None, on_error)
      .await
  }

  async fn send_mutation(&self, spec: RequestSpec) -> Result<bool> {
    let result = {
      let _busy = BusyGuard::show(self.notifier.as_ref(), self.show_busy);
      self.executor.send(&spec).await
    };

    match result.error() {
      None => Ok(true),
      Some(err) => {
        spec.on_error.apply(err, self.notifier.as_ref())?;
        Ok(false)
      }
    }
  }

  /// Send a write on behalf of `entity`.
  ///
  /// When the device is offline the request is stored in the entity's queue
  /// (replacing any pending mutation of the same entity) and cached
  /// collections of the type are patched to match.
  pub async fn mutate_entity<T, E>(
    &self,
    entity: E,
    url: &str,
    method: Method,
    body: RequestBody,
    on_error: OnError,
  ) -> Result<Mutation<T>>
  where
    T: DeserializeOwned + 'static,
    E: Identifiable,
  {
    let spec = self.mutation_spec(url, method, body, on_error)?;

    let result = {
      let _busy = BusyGuard::show(self.notifier.as_ref(), self.show_busy);
      self.executor.send(&spec).await
    };

    let failure = match result {
      SendResult::Ok(response) => match extract_response::<T>(&response.body) {
        Ok(value) => return Ok(Mutation::Applied(value)),
        Err(e) => e,
      },
      SendResult::NotModified => return Ok(Mutation::Applied(None)),
      SendResult::NetworkUnavailable => {
        self.defer(entity, spec).await?;
        return Ok(Mutation::Queued);
      }
      other => other
        .error()
        .unwrap_or_else(|| FetchError::Transport("unclassified send result".to_string())),
    };

    on_error.apply(failure, self.notifier.as_ref())?;
    Ok(Mutation::Failed)
  }

  async fn defer<E: Identifiable>(&self, entity: E, spec: RequestSpec) -> Result<()> {
    let method = spec.method;
    self.queue.upsert(entity.clone(), spec).await?;
    self.reconciler.reconcile(&entity, method)?;
    info!(entity_type = E::entity_type(), %method, "Mutation deferred until back online");
    Ok(())
  }

  /// Replay the queued mutations of `E`. Returns `false` if `E` has no queue.
  pub async fn drain_queue<E: Identifiable>(&self, include_rejected: bool) -> Result<bool> {
    Ok(self.drain_tag(E::entity_type(), include_rejected).await?.is_some())
  }

  /// Replay the queue stored under `type_tag`.
  pub async fn drain_tag(&self, type_tag: &str, include_rejected: bool) -> Result<Option<DrainReport>> {
    self
      .queue
      .drain_tag(type_tag, &self.executor, self.notifier.as_ref(), include_rejected)
      .await
  }

  /// Run [`ApiClient::drain_queue`] in the background. Failures are logged.
  pub fn spawn_drain<E: Identifiable>(&self, include_rejected: bool) -> JoinHandle<bool> {
    let client = self.clone();
    tokio::spawn(async move {
      match client.drain_queue::<E>(include_rejected).await {
        Ok(drained) => drained,
        Err(e) => {
          error!(entity_type = E::entity_type(), error = %e, "Background drain failed");
          false
        }
      }
    })
  }

  pub async fn queued<E: Identifiable>(&self) -> Result<Vec<QueueItem<E>>> {
    self.queue.list_all::<E>().await
  }

  pub async fn raw_queue(&self, type_tag: &str) -> Result<Vec<QueueItem<serde_json::Value>>> {
    self.queue.raw_items(type_tag).await
  }

  /// Drop replayed items from the queue of `E`.
  pub async fn prune_applied<E: Identifiable>(&self) -> Result<usize> {
    self.queue.prune_applied::<E>().await
  }

  /// Remove every cached response.
  pub fn clear_cache(&self) -> Result<usize> {
    let removed = self.cache.clear()?;
    info!(removed, "Cleared response cache");
    Ok(removed)
  }

  /// Remove the cached response for one URL.
  pub fn clear_cache_for(&self, type_tag: &str, url: &str) -> Result<bool> {
    self.cache.delete(type_tag, &self.target(url, &Query::None)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::queue::QueueStatus;
  use crate::store::MemoryStorage;
  use crate::testing::{
    ManualClock, RecordingNotifier, SlowStorage, StubProbe, StubTransport, Task,
  };

  const BASE: &str = "https://api.test/v1/";

  struct Fixture {
    client: ApiClient,
    transport: Arc<StubTransport>,
    probe: Arc<StubProbe>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
  }

  fn fixture() -> Fixture {
    fixture_with(Arc::new(MemoryStorage::new()), false)
  }

  fn fixture_with(storage: Arc<dyn Storage>, trailing_slash: bool) -> Fixture {
    let transport = Arc::new(StubTransport::new());
    let probe = Arc::new(StubProbe::new(true));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new());

    let client = ApiClient::builder(transport.clone(), storage)
      .probe(probe.clone())
      .session_tokens(Arc::new(|| Some("token".to_string())))
      .notifier(notifier.clone())
      .clock(clock.clone())
      .base_url(Url::parse(BASE).unwrap())
      .refresh_delay(Duration::ZERO)
      .ensure_trailing_slash(trailing_slash)
      .build();

    Fixture {
      client,
      transport,
      probe,
      notifier,
      clock,
    }
  }

  impl Fixture {
    fn go_offline(&self) {
      self.probe.set_online(false);
    }

    fn seed_tasks(&self, body: &str) {
      self
        .client
        .cache
        .write("task", "https://api.test/v1/tasks", body)
        .unwrap();
    }

    async fn cached_tasks(&self) -> Option<Vec<Task>> {
      self
        .client
        .fetch_list::<Task>("tasks", &Query::None, CachePolicy::CacheOrNull, None)
        .await
        .unwrap()
    }
  }

  fn task_body(task: &Task) -> RequestBody {
    RequestBody::json(task).unwrap()
  }

  #[tokio::test]
  async fn test_relative_urls_resolve_against_base() {
    let f = fixture();
    f.transport.respond(200, r#"[{"id":1,"title":"a"}]"#);

    let tasks = f
      .client
      .fetch_list::<Task>("/tasks", &Query::pairs([("open", "true")]), CachePolicy::Accept, None)
      .await
      .unwrap();

    assert_eq!(tasks, Some(vec![Task::new(1, "a")]));
    assert_eq!(f.transport.urls(), vec!["https://api.test/v1/tasks?open=true"]);
    assert_eq!(
      f.transport.requests()[0].header("Authorization").as_deref(),
      Some("Bearer token")
    );
  }

  #[tokio::test]
  async fn test_trailing_slash_is_added_only_without_query() {
    let f = fixture_with(Arc::new(MemoryStorage::new()), true);
    f.transport.respond(200, "[]");
    f.transport.respond(200, "[]");
    f.transport.respond(200, "");

    let _: Option<Vec<Task>> = f
      .client
      .fetch_list("tasks", &Query::None, CachePolicy::Accept, None)
      .await
      .unwrap();
    let _: Option<Vec<Task>> = f
      .client
      .fetch_list("tasks", &Query::pairs([("page", "2")]), CachePolicy::Accept, None)
      .await
      .unwrap();
    assert!(f
      .client
      .mutate("tasks/3", Method::Delete, RequestBody::Empty, OnError::Throw)
      .await
      .unwrap());

    assert_eq!(
      f.transport.urls(),
      vec![
        "https://api.test/v1/tasks/",
        "https://api.test/v1/tasks?page=2",
        "https://api.test/v1/tasks/3/",
      ]
    );
  }

  #[tokio::test]
  async fn test_relative_url_without_base_is_rejected() {
    let client = ApiClient::builder(
      Arc::new(StubTransport::forbidden()),
      Arc::new(MemoryStorage::new()),
    )
    .probe(Arc::new(StubProbe::new(true)))
    .notifier(Arc::new(RecordingNotifier::default()))
    .build();

    let result: Result<Option<Vec<u32>>> = client
      .fetch("item", "items", &Query::None, CachePolicy::Accept, None)
      .await;
    assert!(matches!(result, Err(FetchError::InvalidArgument(_))));
  }

  #[tokio::test]
  async fn test_mutate_reports_success_and_busy() {
    let f = fixture();
    f.transport.respond(204, "");

    let ok = f
      .client
      .mutate("tasks/1/archive", Method::Post, RequestBody::Empty, OnError::Alert)
      .await
      .unwrap();

    assert!(ok);
    assert_eq!(f.notifier.busy_events(), vec![true, false]);
    let sent = &f.transport.requests()[0];
    assert_eq!(sent.method, Method::Post);
    assert_eq!(
      sent.header("Content-Type").as_deref(),
      Some("application/x-www-form-urlencoded")
    );
  }

  #[tokio::test]
  async fn test_mutate_failure_goes_through_error_policy() {
    let f = fixture();
    f.transport.respond(400, r#"{"Message":"Title is required"}"#);

    let ok = f
      .client
      .mutate("tasks", Method::Post, RequestBody::Text("title=".into()), OnError::Alert)
      .await
      .unwrap();

    assert!(!ok);
    assert_eq!(f.notifier.alerts(), vec!["Title is required"]);
    assert_eq!(f.notifier.busy_events(), vec![true, false]);

    f.transport.respond(500, "Error");
    let thrown = f
      .client
      .mutate("tasks", Method::Post, RequestBody::Empty, OnError::Throw)
      .await;
    assert!(matches!(thrown, Err(FetchError::Http { status: 500, .. })));
    assert_eq!(f.notifier.busy_events(), vec![true, false, true, false]);
  }

  #[tokio::test]
  async fn test_get_is_not_a_mutation() {
    let f = fixture();
    let result = f
      .client
      .mutate("tasks", Method::Get, RequestBody::Empty, OnError::Ignore)
      .await;
    assert!(matches!(result, Err(FetchError::InvalidArgument(_))));
    assert!(f.transport.requests().is_empty());
  }

  #[tokio::test]
  async fn test_online_entity_mutation_decodes_response() {
    let f = fixture();
    f.transport.respond(200, r#"{"id":3,"title":"new"}"#);

    let created: Mutation<Task> = f
      .client
      .mutate_entity(Task::new(3, "new"), "tasks", Method::Post, task_body(&Task::new(3, "new")), OnError::Alert)
      .await
      .unwrap();

    assert_eq!(created, Mutation::Applied(Some(Task::new(3, "new"))));
    assert!(f.client.queued::<Task>().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_offline_delete_queues_and_reconciles() {
    let f = fixture();
    f.seed_tasks(r#"[{"id":7,"title":"seven"},{"id":9,"title":"nine"}]"#);
    f.go_offline();
    f.transport.fail("dns lookup failed");

    let deleted: Mutation<bool> = f
      .client
      .mutate_entity(Task::new(7, "seven"), "tasks/7", Method::Delete, RequestBody::Empty, OnError::Alert)
      .await
      .unwrap();

    assert_eq!(deleted, Mutation::Queued);
    assert!(deleted.succeeded());
    assert!(f.notifier.alerts().is_empty());

    let queued = f.client.queued::<Task>().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].status, QueueStatus::Added);
    assert_eq!(queued[0].entity.id, 7);
    assert_eq!(queued[0].request.url, "https://api.test/v1/tasks/7");

    assert_eq!(f.cached_tasks().await, Some(vec![Task::new(9, "nine")]));
  }

  #[tokio::test]
  async fn test_repeated_offline_edit_replaces_queued_item() {
    let f = fixture();
    f.seed_tasks(r#"[{"id":9,"title":"nine"}]"#);
    f.go_offline();

    for title in ["draft", "final"] {
      f.transport.fail("offline");
      f.clock.advance(60);
      let task = Task::new(9, title);
      let result: Mutation<Task> = f
        .client
        .mutate_entity(task.clone(), "tasks/9", Method::Put, task_body(&task), OnError::Alert)
        .await
        .unwrap();
      assert_eq!(result, Mutation::Queued);
    }

    let queued = f.client.queued::<Task>().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].entity, Task::new(9, "final"));
    assert!(queued[0].time_updated.is_some());
    assert_eq!(f.cached_tasks().await, Some(vec![Task::new(9, "final")]));
  }

  #[tokio::test]
  async fn test_drain_replays_queued_mutations() {
    let f = fixture();
    f.go_offline();
    f.transport.fail("offline");
    let task = Task::new(4, "four");
    let _: Mutation<Task> = f
      .client
      .mutate_entity(task.clone(), "tasks/4", Method::Patch, task_body(&task), OnError::Alert)
      .await
      .unwrap();

    f.probe.set_online(true);
    f.transport.respond(200, "");
    assert!(f.client.drain_queue::<Task>(false).await.unwrap());

    let replayed = f.transport.requests().pop().unwrap();
    assert_eq!(replayed.method, Method::Patch);
    assert_eq!(replayed.url, "https://api.test/v1/tasks/4");
    assert_eq!(f.client.queued::<Task>().await.unwrap()[0].status, QueueStatus::Applied);

    assert_eq!(f.client.prune_applied::<Task>().await.unwrap(), 1);
    assert!(f.client.queued::<Task>().await.unwrap().is_empty());
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn test_concurrent_offline_edits_queue_one_item() {
    let f = fixture_with(Arc::new(SlowStorage::new()), false);
    f.go_offline();

    let mut handles = Vec::new();
    for n in 0..8 {
      let client = f.client.clone();
      handles.push(tokio::spawn(async move {
        let task = Task::new(9, &format!("edit {}", n));
        let result: Mutation<Task> = client
          .mutate_entity(task.clone(), "tasks/9", Method::Put, task_body(&task), OnError::Alert)
          .await
          .unwrap();
        assert_eq!(result, Mutation::Queued);
      }));
    }
    for handle in handles {
      handle.await.unwrap();
    }

    let queued = f.client.queued::<Task>().await.unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].entity.id, 9);
  }

  #[tokio::test]
  async fn test_rejected_replay_uses_queued_error_policy() {
    let f = fixture();
    f.go_offline();
    let task = Task::new(4, "four");
    let _: Mutation<Task> = f
      .client
      .mutate_entity(task.clone(), "tasks/4", Method::Patch, task_body(&task), OnError::Alert)
      .await
      .unwrap();
    assert!(f.notifier.alerts().is_empty());

    f.probe.set_online(true);
    f.transport.respond(409, r#"{"Message":"Conflict"}"#);
    let report = f.client.drain_tag("task", false).await.unwrap().unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(f.notifier.alerts(), vec!["Conflict"]);
    assert_eq!(f.client.queued::<Task>().await.unwrap()[0].status, QueueStatus::Rejected);
  }

  #[tokio::test]
  async fn test_drain_without_queue_returns_false() {
    let f = fixture();
    assert!(!f.client.drain_queue::<Task>(false).await.unwrap());
    assert!(!f.client.spawn_drain::<Task>(true).await.unwrap());
  }

  #[tokio::test]
  async fn test_online_failure_is_not_queued() {
    let f = fixture();
    f.transport.fail("connection refused");

    let result: Mutation<Task> = f
      .client
      .mutate_entity(Task::new(1, "a"), "tasks/1", Method::Delete, RequestBody::Empty, OnError::Toast)
      .await
      .unwrap();

    assert_eq!(result, Mutation::Failed);
    assert_eq!(f.notifier.toasts().len(), 1);
    assert!(f.client.raw_queue("task").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_clear_cache() {
    let f = fixture();
    f.seed_tasks("[]");
    f.client
      .cache
      .write("task", "https://api.test/v1/tasks?page=2", "[]")
      .unwrap();

    assert!(f.client.clear_cache_for("task", "tasks").unwrap());
    assert!(!f.client.clear_cache_for("task", "tasks").unwrap());
    assert_eq!(f.client.clear_cache().unwrap(), 1);
    assert_eq!(f.cached_tasks().await, None);
  }
}
