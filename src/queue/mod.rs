//! Durable queue of mutations made while offline.
//!
//! Each entity type has one ordered sequence of [`QueueItem`]s, persisted as a
//! single JSON blob. Every read-modify-write of a sequence, including a whole
//! drain pass, runs under the queue lock.

mod item;

pub use item::{DrainReport, Identifiable, QueueItem, QueueStatus};

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{FetchError, Result};
use crate::http::{Method, RequestExecutor, RequestSpec};
use crate::platform::{Clock, Notifier};
use crate::store::EntryStore;

#[derive(Clone)]
pub struct OfflineQueue {
  store: EntryStore,
  lock: Arc<Mutex<()>>,
  clock: Arc<dyn Clock>,
}

impl OfflineQueue {
  pub fn new(store: EntryStore, clock: Arc<dyn Clock>) -> Self {
    Self {
      store,
      lock: Arc::new(Mutex::new(())),
      clock,
    }
  }

  fn load<E: DeserializeOwned>(&self, type_tag: &str) -> Result<Option<Vec<QueueItem<E>>>> {
    let Some(text) = self.store.read_queue(type_tag)? else {
      return Ok(None);
    };
    if text.trim().is_empty() {
      return Ok(Some(Vec::new()));
    }

    serde_json::from_str(&text)
      .map(Some)
      .map_err(|source| FetchError::Decode {
        target: "offline queue",
        source,
      })
  }

  fn save<E: Serialize>(&self, type_tag: &str, items: &[QueueItem<E>]) -> Result<()> {
    let text = serde_json::to_string(items)
      .map_err(|e| FetchError::Storage(format!("Failed to serialize queue: {}", e)))?;
    self.store.write_queue(type_tag, &text)
  }

  /// Append a new item for `entity`, pending replay of `request`.
  pub async fn enqueue<E: Identifiable>(&self, entity: E, request: RequestSpec) -> Result<()> {
    let tag = E::entity_type();
    let _guard = self.lock.lock().await;

    let mut items = self.load::<E>(tag)?.unwrap_or_default();
    items.push(QueueItem::new(entity, request, self.clock.now()));
    self.save(tag, &items)?;

    info!(entity_type = tag, pending = items.len(), "Queued offline mutation");
    Ok(())
  }

  /// Replace the queued item with the same ID as `entity`, keeping its place.
  ///
  /// The item is re-armed as `Added`. A pending create absorbs a later update:
  /// it stays a POST to its original URL but carries the new body. Returns
  /// whether a matching item was found.
  pub async fn update_by_id<E: Identifiable>(
    &self,
    entity: &E,
    request: RequestSpec,
  ) -> Result<bool> {
    let tag = E::entity_type();
    let _guard = self.lock.lock().await;

    let Some(mut items) = self.load::<E>(tag)? else {
      return Ok(false);
    };
    if !self.replace(&mut items, entity, request) {
      return Ok(false);
    }

    self.save(tag, &items)?;
    debug!(entity_type = tag, id = ?entity.id(), "Replaced queued mutation");
    Ok(true)
  }

  /// [`OfflineQueue::update_by_id`], falling back to [`OfflineQueue::enqueue`]
  /// when no item matches, in one locked pass. Returns whether an item was
  /// replaced.
  pub async fn upsert<E: Identifiable>(&self, entity: E, request: RequestSpec) -> Result<bool> {
    let tag = E::entity_type();
    let _guard = self.lock.lock().await;

    let mut items = self.load::<E>(tag)?.unwrap_or_default();
    let replaced = self.replace(&mut items, &entity, request.clone());
    if !replaced {
      items.push(QueueItem::new(entity, request, self.clock.now()));
    }
    self.save(tag, &items)?;

    debug!(entity_type = tag, replaced, pending = items.len(), "Stored offline mutation");
    Ok(replaced)
  }

  fn replace<E: Identifiable>(
    &self,
    items: &mut [QueueItem<E>],
    entity: &E,
    request: RequestSpec,
  ) -> bool {
    let id = entity.id();
    let Some(existing) = items.iter_mut().find(|item| item.entity.id() == id) else {
      return false;
    };

    let absorbs_update = existing.status != QueueStatus::Applied
      && existing.request.method == Method::Post
      && matches!(request.method, Method::Put | Method::Patch);

    existing.request = if absorbs_update {
      RequestSpec {
        method: Method::Post,
        url: existing.request.url.clone(),
        ..request
      }
    } else {
      request
    };
    existing.entity = entity.clone();
    existing.status = QueueStatus::Added;
    existing.time_updated = Some(self.clock.now());
    true
  }

  /// Every item of the type, in insertion order.
  pub async fn list_all<E: Identifiable>(&self) -> Result<Vec<QueueItem<E>>> {
    let _guard = self.lock.lock().await;
    Ok(self.load(E::entity_type())?.unwrap_or_default())
  }

  /// Items of any type tag with their entities left as JSON.
  pub async fn raw_items(&self, type_tag: &str) -> Result<Vec<QueueItem<serde_json::Value>>> {
    let _guard = self.lock.lock().await;
    Ok(self.load(type_tag)?.unwrap_or_default())
  }

  /// Replay the type's pending items. See [`OfflineQueue::drain_tag`].
  pub async fn drain<E: Identifiable>(
    &self,
    executor: &RequestExecutor,
    notifier: &dyn Notifier,
    include_rejected: bool,
  ) -> Result<Option<DrainReport>> {
    self
      .drain_tag(E::entity_type(), executor, notifier, include_rejected)
      .await
  }

  /// Replay pending items in ascending `time_added` order, one at a time.
  ///
  /// Success marks an item `Applied`, any failure marks it `Rejected`; nothing
  /// is removed. Each rejection goes through the error policy stored with its
  /// request. The sequence is written back once after the pass; the first
  /// error an `OnError::Throw` item raised is returned after that. Returns
  /// `None` when the type has no stored queue.
  pub async fn drain_tag(
    &self,
    type_tag: &str,
    executor: &RequestExecutor,
    notifier: &dyn Notifier,
    include_rejected: bool,
  ) -> Result<Option<DrainReport>> {
    let _guard = self.lock.lock().await;

    let Some(mut items) = self.load::<serde_json::Value>(type_tag)? else {
      return Ok(None);
    };

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].time_added);

    let mut report = DrainReport::default();
    let mut thrown = None;
    for i in order {
      let item = &mut items[i];
      if !item.status.is_replayable(include_rejected) {
        report.skipped += 1;
        continue;
      }

      let result = executor.send(&item.request).await;
      match result.error() {
        None => {
          item.status = QueueStatus::Applied;
          report.applied += 1;
        }
        Some(err) => {
          warn!(
            entity_type = type_tag,
            method = %item.request.method,
            url = %item.request.url,
            error = %err,
            "Queued mutation rejected"
          );
          item.status = QueueStatus::Rejected;
          report.rejected += 1;
          if let Err(err) = item.request.on_error.apply(err, notifier) {
            thrown.get_or_insert(err);
          }
        }
      }
      item.time_updated = Some(self.clock.now());
    }

    self.save(type_tag, &items)?;
    info!(
      entity_type = type_tag,
      applied = report.applied,
      rejected = report.rejected,
      skipped = report.skipped,
      "Drained offline queue"
    );
    match thrown {
      Some(err) => Err(err),
      None => Ok(Some(report)),
    }
  }

  /// Remove `Applied` items. Never called implicitly.
  pub async fn prune_applied<E: Identifiable>(&self) -> Result<usize> {
    let tag = E::entity_type();
    let _guard = self.lock.lock().await;

    let Some(mut items) = self.load::<serde_json::Value>(tag)? else {
      return Ok(0);
    };
    let before = items.len();
    items.retain(|item| item.status != QueueStatus::Applied);
    let removed = before - items.len();
    if removed > 0 {
      self.save(tag, &items)?;
    }
    Ok(removed)
  }
}
