//! Key shapes used on top of the raw [`Storage`].

use std::sync::Arc;

use super::storage::Storage;
use crate::error::{FetchError, Result};

const CACHE_NAMESPACE: &str = "api-cache";
const QUEUE_NAMESPACE: &str = "api-queue";

/// Durable entries keyed by (bucket, hashed key).
///
/// Cache entries live under `api-cache` as `<type_tag>/<url_hash>`; each
/// entity type's queue is one blob under `api-queue` keyed by its type tag.
#[derive(Clone)]
pub struct EntryStore {
  storage: Arc<dyn Storage>,
}

impl EntryStore {
  pub fn new(storage: Arc<dyn Storage>) -> Self {
    Self { storage }
  }

  fn cache_key(type_tag: &str, url_hash: &str) -> Result<String> {
    Ok(format!("{}{}", Self::bucket_prefix(type_tag)?, url_hash))
  }

  fn bucket_prefix(type_tag: &str) -> Result<String> {
    if type_tag.is_empty() || type_tag.contains('/') {
      return Err(FetchError::InvalidArgument(format!(
        "type tag '{}' must be non-empty and must not contain '/'",
        type_tag
      )));
    }
    Ok(format!("{}/", type_tag))
  }

  pub fn read_cache(&self, type_tag: &str, url_hash: &str) -> Result<Option<String>> {
    self
      .storage
      .read_text(CACHE_NAMESPACE, &Self::cache_key(type_tag, url_hash)?)
  }

  pub fn write_cache(&self, type_tag: &str, url_hash: &str, text: &str) -> Result<()> {
    self
      .storage
      .write_text(CACHE_NAMESPACE, &Self::cache_key(type_tag, url_hash)?, text)
  }

  pub fn delete_cache(&self, type_tag: &str, url_hash: &str) -> Result<bool> {
    self
      .storage
      .delete(CACHE_NAMESPACE, &Self::cache_key(type_tag, url_hash)?)
  }

  /// URL hashes of every cache entry in a type's bucket.
  pub fn cache_hashes(&self, type_tag: &str) -> Result<Vec<String>> {
    let prefix = Self::bucket_prefix(type_tag)?;
    let keys = self.storage.keys(CACHE_NAMESPACE, &prefix)?;
    Ok(
      keys
        .into_iter()
        .filter_map(|key| key.strip_prefix(&prefix).map(String::from))
        .collect(),
    )
  }

  pub fn clear_cache(&self) -> Result<usize> {
    self.storage.clear(CACHE_NAMESPACE)
  }

  pub fn read_queue(&self, type_tag: &str) -> Result<Option<String>> {
    self.storage.read_text(QUEUE_NAMESPACE, type_tag)
  }

  pub fn write_queue(&self, type_tag: &str, text: &str) -> Result<()> {
    self.storage.write_text(QUEUE_NAMESPACE, type_tag, text)
  }
}
