//! Cache-vs-network precedence for reads.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::refresh::{ConditionalRefresher, OnUpdate};
use super::response::ResponseCache;
use crate::error::{FetchError, Result};
use crate::http::url::{with_query, Query};
use crate::http::{extract_response, RequestExecutor, RequestSpec, SendResult};
use crate::platform::{Notifier, OnError};

/// Notice shown when `AcceptButWarn` serves a cached copy.
pub const STALE_DATA_WARNING: &str = "The latest data cannot be received from the server right now.";

/// Strategy for one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
  /// Fetch fresh; the cache is only a fallback on error
  #[default]
  Accept,
  /// Serve the cache if present, otherwise fetch
  Prefer,
  /// Serve the cache if present and revalidate it in the background
  PreferThenUpdate,
  /// Fetch fresh and never fall back to the cache
  Refuse,
  /// Like `Accept`, but warn the user when the fallback is used
  AcceptButWarn,
  /// Serve the cache only; never touch the network
  CacheOrNull,
}

impl CachePolicy {
  fn reads_cache_first(&self) -> bool {
    matches!(
      self,
      CachePolicy::Prefer | CachePolicy::PreferThenUpdate | CachePolicy::CacheOrNull
    )
  }
}

impl fmt::Display for CachePolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      CachePolicy::Accept => "accept",
      CachePolicy::Prefer => "prefer",
      CachePolicy::PreferThenUpdate => "prefer-then-update",
      CachePolicy::Refuse => "refuse",
      CachePolicy::AcceptButWarn => "accept-but-warn",
      CachePolicy::CacheOrNull => "cache-or-null",
    };
    write!(f, "{}", name)
  }
}

impl std::str::FromStr for CachePolicy {
  type Err = FetchError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
      "accept" => Ok(CachePolicy::Accept),
      "prefer" => Ok(CachePolicy::Prefer),
      "prefer-then-update" => Ok(CachePolicy::PreferThenUpdate),
      "refuse" => Ok(CachePolicy::Refuse),
      "accept-but-warn" => Ok(CachePolicy::AcceptButWarn),
      "cache-or-null" => Ok(CachePolicy::CacheOrNull),
      other => Err(FetchError::InvalidArgument(format!(
        "unknown cache policy '{}'",
        other
      ))),
    }
  }
}

/// Resolves reads against [`ResponseCache`] and the network per [`CachePolicy`].
#[derive(Clone)]
pub struct CachePolicyEngine {
  cache: ResponseCache,
  executor: RequestExecutor,
  refresher: ConditionalRefresher,
  notifier: Arc<dyn Notifier>,
}

impl CachePolicyEngine {
  pub fn new(
    cache: ResponseCache,
    executor: RequestExecutor,
    refresher: ConditionalRefresher,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    Self {
      cache,
      executor,
      refresher,
      notifier,
    }
  }

  /// Read `url` (with `query` merged in) as `T` under `policy`.
  ///
  /// `on_update` must be given exactly when the policy is `PreferThenUpdate`.
  /// Failures that are not recovered from the cache go through `on_error`;
  /// with anything but `OnError::Throw` they end in `Ok(None)` or a cached value.
  pub async fn fetch<T>(
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
    match (policy, on_update.is_some()) {
      (CachePolicy::PreferThenUpdate, false) => {
        return Err(FetchError::InvalidArgument(
          "prefer-then-update needs an update callback".to_string(),
        ))
      }
      (CachePolicy::PreferThenUpdate, true) | (_, false) => {}
      (_, true) => {
        return Err(FetchError::InvalidArgument(format!(
          "an update callback is only accepted with prefer-then-update, not {}",
          policy
        )))
      }
    }

    let url = with_query(url, query);

    if policy.reads_cache_first() {
      if let Some(cached) = self.read_cached::<T>(type_tag, &url, on_error)? {
        debug!(type_tag, url = %url, %policy, "Serving cached response");
        if let Some(on_update) = on_update {
          self.refresher.spawn(type_tag.to_string(), url, on_update);
        }
        return Ok(Some(cached));
      }
      if policy == CachePolicy::CacheOrNull {
        debug!(type_tag, url = %url, "No cached response");
        return Ok(None);
      }
    }

    let spec = RequestSpec::get(url.as_str()).on_error(on_error);
    let failure = match self.executor.send(&spec).await {
      SendResult::Ok(response) => match extract_response::<T>(&response.body) {
        Ok(value) => {
          if let Err(e) = self.cache.write(type_tag, &url, &response.body) {
            warn!(type_tag, url = %url, error = %e, "Failed to cache response");
          }
          return Ok(value);
        }
        Err(e) => e,
      },
      other => other.error().unwrap_or_else(|| {
        FetchError::Transport("unexpected not-modified response to an unconditional read".to_string())
      }),
    };

    on_error.apply(failure, self.notifier.as_ref())?;

    if policy == CachePolicy::Refuse {
      return Ok(None);
    }

    let cached = self.read_cached::<T>(type_tag, &url, on_error)?;
    if cached.is_some() {
      debug!(type_tag, url = %url, %policy, "Falling back to cached response");
      if policy == CachePolicy::AcceptButWarn {
        self.notifier.toast(STALE_DATA_WARNING);
      }
    }
    Ok(cached)
  }

  /// A cache entry that cannot be read counts as missing once `on_error`
  /// has seen it.
  fn read_cached<T: DeserializeOwned>(
    &self,
    type_tag: &str,
    url: &str,
    on_error: OnError,
  ) -> Result<Option<T>> {
    match self.cache.read::<T>(type_tag, url) {
      Ok(cached) => Ok(cached),
      Err(e) => {
        on_error.apply(e, self.notifier.as_ref())?;
        Ok(None)
      }
    }
  }
}
