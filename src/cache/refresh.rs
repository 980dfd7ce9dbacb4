//! Background revalidation of cached responses.

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::key::fingerprint;
use super::response::ResponseCache;
use crate::http::{extract_response, RequestExecutor, RequestSpec, SendResult};
use crate::platform::OnError;

/// Callback receiving a freshly revalidated value.
pub type OnUpdate<T> = Box<dyn FnOnce(T) -> BoxFuture<'static, ()> + Send + 'static>;

/// How a revalidation pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
  /// The entry was evicted before the pass started
  CacheMissing,
  NotModified,
  /// The server sent the same bytes again
  Unchanged,
  Updated,
  Failed,
}

/// Revalidates cache entries against the server using content fingerprints.
#[derive(Clone)]
pub struct ConditionalRefresher {
  cache: ResponseCache,
  executor: RequestExecutor,
  delay: Duration,
}

impl ConditionalRefresher {
  pub fn new(cache: ResponseCache, executor: RequestExecutor, delay: Duration) -> Self {
    Self {
      cache,
      executor,
      delay,
    }
  }

  /// Run [`ConditionalRefresher::revalidate`] as a detached task.
  pub fn spawn<T>(&self, type_tag: String, url: String, on_update: OnUpdate<T>) -> JoinHandle<()>
  where
    T: DeserializeOwned + Send + 'static,
  {
    let refresher = self.clone();
    tokio::spawn(async move {
      let outcome = refresher.revalidate(&type_tag, &url, on_update).await;
      debug!(type_tag = %type_tag, url = %url, ?outcome, "Revalidation finished");
    })
  }

  /// Compare the cached entry with the server's current response and, if it
  /// changed, store it and hand the decoded value to `on_update`.
  ///
  /// Failures are logged and reported as [`RefreshOutcome::Failed`].
  pub async fn revalidate<T>(&self, type_tag: &str, url: &str, on_update: OnUpdate<T>) -> RefreshOutcome
  where
    T: DeserializeOwned + Send + 'static,
  {
    tokio::time::sleep(self.delay).await;

    let local = match self.cache.fingerprint(type_tag, url) {
      Ok(Some(local)) => local,
      Ok(None) => {
        info!(type_tag, url, "Cache entry vanished before revalidation");
        return RefreshOutcome::CacheMissing;
      }
      Err(e) => {
        error!(type_tag, url, error = %e, "Failed to read cache for revalidation");
        return RefreshOutcome::Failed;
      }
    };

    let spec = RequestSpec::get(url)
      .on_error(OnError::Throw)
      .with_fingerprint(local.clone());

    let response = match self.executor.send(&spec).await {
      SendResult::Ok(response) => response,
      SendResult::NotModified => return RefreshOutcome::NotModified,
      other => {
        if let Some(err) = other.error() {
          warn!(type_tag, url, error = %err, "Revalidation request failed");
        }
        return RefreshOutcome::Failed;
      }
    };

    if fingerprint(&response.body) == local {
      return RefreshOutcome::Unchanged;
    }

    let value = match extract_response::<T>(&response.body) {
      Ok(Some(value)) => value,
      Ok(None) => {
        warn!(type_tag, url, "Revalidation returned an empty body");
        return RefreshOutcome::Failed;
      }
      Err(e) => {
        error!(type_tag, url, error = %e, "Revalidated response did not decode");
        return RefreshOutcome::Failed;
      }
    };

    if let Err(e) = self.cache.write(type_tag, url, &response.body) {
      error!(type_tag, url, error = %e, "Failed to store revalidated response");
      return RefreshOutcome::Failed;
    }

    on_update(value).await;
    RefreshOutcome::Updated
  }
}
