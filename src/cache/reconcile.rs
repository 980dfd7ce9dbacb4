//! Patches cached collections after a local mutation.

use tracing::{debug, info};

use super::response::ResponseCache;
use crate::error::{FetchError, Result};
use crate::http::Method;
use crate::queue::Identifiable;

/// Keeps cached list responses consistent with mutations made while offline
/// (or just made online, before the next fetch).
#[derive(Clone)]
pub struct CacheReconciler {
  cache: ResponseCache,
}

impl CacheReconciler {
  pub fn new(cache: ResponseCache) -> Self {
    Self { cache }
  }

  /// Apply `modified` to every cached collection of its type.
  ///
  /// DELETE removes matching records, PUT/PATCH replace them. Creates are not
  /// reconciled. Entries that are not collections of `E` are skipped.
  /// Returns the number of cache entries rewritten.
  pub fn reconcile<E: Identifiable>(&self, modified: &E, method: Method) -> Result<usize> {
    let remove = match method {
      Method::Delete => true,
      Method::Put | Method::Patch => false,
      Method::Get | Method::Post => {
        debug!(type_tag = E::entity_type(), %method, "Nothing to reconcile");
        return Ok(0);
      }
    };

    let id = modified.id();
    let replacement = serde_json::to_value(modified).map_err(|source| FetchError::Decode {
      target: E::entity_type(),
      source,
    })?;

    let rewritten = self.cache.rewrite_bucket(E::entity_type(), |text| {
      let mut records: Vec<E> = serde_json::from_str(text).ok()?;
      let mut changed = false;

      if remove {
        let before = records.len();
        records.retain(|record| record.id() != id);
        changed = records.len() != before;
      } else {
        for record in records.iter_mut().filter(|r| r.id() == id) {
          if serde_json::to_value(&*record).ok().as_ref() != Some(&replacement) {
            *record = modified.clone();
            changed = true;
          }
        }
      }

      if !changed {
        return None;
      }
      serde_json::to_string(&records).ok()
    })?;

    if rewritten > 0 {
      info!(type_tag = E::entity_type(), %method, id = ?id, rewritten, "Reconciled cached collections");
    }
    Ok(rewritten)
  }
}
