//! Core traits and types for queued mutations.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

use crate::http::RequestSpec;

/// Domain entities that can be queued and reconciled into cached collections.
pub trait Identifiable: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  type Id: PartialEq + fmt::Debug;

  /// Unique identifier within the entity type
  fn id(&self) -> Self::Id;

  /// Stable type tag naming the entity's cache bucket and queue (e.g. "task")
  fn entity_type() -> &'static str;
}

/// Where a queued mutation is in its replay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
  /// Waiting for the first replay
  Added,
  /// Replayed successfully. Terminal.
  Applied,
  /// Replay failed; retried only by a drain that includes rejected items
  Rejected,
}

impl QueueStatus {
  pub fn is_replayable(&self, include_rejected: bool) -> bool {
    match self {
      QueueStatus::Added => true,
      QueueStatus::Rejected => include_rejected,
      QueueStatus::Applied => false,
    }
  }
}

impl fmt::Display for QueueStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      QueueStatus::Added => write!(f, "added"),
      QueueStatus::Applied => write!(f, "applied"),
      QueueStatus::Rejected => write!(f, "rejected"),
    }
  }
}

/// A mutation that could not reach the server, persisted for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem<E> {
  pub entity: E,
  pub status: QueueStatus,
  pub time_added: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub time_updated: Option<DateTime<Utc>>,
  /// The request that failed to send
  pub request: RequestSpec,
}

impl<E> QueueItem<E> {
  pub fn new(entity: E, request: RequestSpec, now: DateTime<Utc>) -> Self {
    Self {
      entity,
      status: QueueStatus::Added,
      time_added: now,
      time_updated: None,
      request,
    }
  }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
  pub applied: usize,
  pub rejected: usize,
  /// Items left untouched (already applied, or rejected and not retried)
  pub skipped: usize,
}

impl DrainReport {
  pub fn attempted(&self) -> usize {
    self.applied + self.rejected
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_replayable_statuses() {
    assert!(QueueStatus::Added.is_replayable(false));
    assert!(!QueueStatus::Rejected.is_replayable(false));
    assert!(QueueStatus::Rejected.is_replayable(true));
    assert!(!QueueStatus::Applied.is_replayable(true));
  }
}
