//! Per-type, per-URL cached response bodies.

use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::key::{fingerprint, url_hash};
use crate::error::{FetchError, Result};
use crate::store::EntryStore;

/// Raw response text cached by (type tag, URL).
///
/// Entries never expire; they are overwritten by the next successful read of
/// the same URL and removed only by the `delete`/`clear` calls.
#[derive(Clone)]
pub struct ResponseCache {
  store: EntryStore,
  lock: Arc<Mutex<()>>,
}

impl ResponseCache {
  pub fn new(store: EntryStore) -> Self {
    Self {
      store,
      lock: Arc::new(Mutex::new(())),
    }
  }

  fn guard(&self) -> Result<MutexGuard<'_, ()>> {
    self
      .lock
      .lock()
      .map_err(|e| FetchError::Storage(format!("Lock poisoned: {}", e)))
  }

  pub fn read_text(&self, type_tag: &str, url: &str) -> Result<Option<String>> {
    let _guard = self.guard()?;
    self.store.read_cache(type_tag, &url_hash(url))
  }

  /// Cached value decoded as `T`. An entry that no longer decodes counts as absent.
  pub fn read<T: DeserializeOwned>(&self, type_tag: &str, url: &str) -> Result<Option<T>> {
    let Some(text) = self.read_text(type_tag, url)? else {
      return Ok(None);
    };

    match serde_json::from_str(&text) {
      Ok(value) => Ok(Some(value)),
      Err(e) => {
        debug!(type_tag, url, error = %e, "Ignoring undecodable cache entry");
        Ok(None)
      }
    }
  }

  pub fn write(&self, type_tag: &str, url: &str, text: &str) -> Result<()> {
    let _guard = self.guard()?;
    self.store.write_cache(type_tag, &url_hash(url), text)
  }

  pub fn delete(&self, type_tag: &str, url: &str) -> Result<bool> {
    let _guard = self.guard()?;
    self.store.delete_cache(type_tag, &url_hash(url))
  }

  /// Remove every cached response of every type.
  pub fn clear(&self) -> Result<usize> {
    let _guard = self.guard()?;
    self.store.clear_cache()
  }

  /// Fingerprint of the cached text, if an entry exists.
  pub fn fingerprint(&self, type_tag: &str, url: &str) -> Result<Option<String>> {
    Ok(self.read_text(type_tag, url)?.map(|text| fingerprint(&text)))
  }

  /// Rewrite entries of one type in a single locked pass.
  ///
  /// `rewrite` returns the replacement text, or `None` to leave the entry alone.
  /// Returns the number of entries rewritten.
  pub fn rewrite_bucket<F>(&self, type_tag: &str, mut rewrite: F) -> Result<usize>
  where
    F: FnMut(&str) -> Option<String>,
  {
    let _guard = self.guard()?;
    let mut rewritten = 0;

    for hash in self.store.cache_hashes(type_tag)? {
      let Some(text) = self.store.read_cache(type_tag, &hash)? else {
        continue;
      };
      if let Some(replacement) = rewrite(&text) {
        self.store.write_cache(type_tag, &hash, &replacement)?;
        rewritten += 1;
      }
    }

    Ok(rewritten)
  }
}
