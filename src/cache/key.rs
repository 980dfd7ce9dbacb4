//! Cache keys and content fingerprints.

use sha2::{Digest, Sha256};
use url::Url;

/// Stable storage-safe key for a fully-qualified request URL.
///
/// Query parameters are sorted before hashing so that the same parameter set
/// maps to the same entry whatever order it was written in.
pub fn url_hash(url: &str) -> String {
  sha256_hex(normalize_url(url).as_bytes())
}

/// Fingerprint of a response body, used for conditional revalidation.
pub fn fingerprint(body: &str) -> String {
  sha256_hex(body.as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
  let mut hasher = Sha256::new();
  hasher.update(bytes);
  hex::encode(hasher.finalize())
}

fn normalize_url(raw: &str) -> String {
  let mut url = match Url::parse(raw.trim()) {
    Ok(url) => url,
    Err(_) => return raw.trim().to_string(),
  };

  url.set_fragment(None);

  let mut pairs: Vec<(String, String)> = url
    .query_pairs()
    .filter(|(k, _)| !k.is_empty())
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  if pairs.is_empty() {
    url.set_query(None);
  } else {
    pairs.sort();
    url.query_pairs_mut().clear().extend_pairs(pairs.iter());
  }

  url.to_string()
}
