//! URL resolution and query-string merging.

use serde::Serialize;
use url::Url;

use crate::error::{FetchError, Result};

/// Query parameters for a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Query {
  #[default]
  None,
  /// Pre-encoded query string, appended verbatim
  Raw(String),
  Pairs(Vec<(String, String)>),
}

impl Query {
  pub fn pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
  where
    K: Into<String>,
    V: Into<String>,
  {
    Query::Pairs(
      pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }

  /// Build from any value that serializes to a flat object.
  pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
    let value = serde_json::to_value(value)
      .map_err(|e| FetchError::InvalidArgument(format!("query is not serializable: {}", e)))?;

    let object = match value {
      serde_json::Value::Null => return Ok(Query::None),
      serde_json::Value::Object(object) => object,
      other => {
        return Err(FetchError::InvalidArgument(format!(
          "query must be an object, got {}",
          other
        )))
      }
    };

    let pairs = object
      .into_iter()
      .map(|(name, value)| {
        let value = match value {
          serde_json::Value::Null => String::new(),
          serde_json::Value::String(s) => s,
          serde_json::Value::Bool(b) => b.to_string(),
          serde_json::Value::Number(n) => n.to_string(),
          nested => {
            return Err(FetchError::InvalidArgument(format!(
              "query parameter '{}' must be a scalar, got {}",
              name, nested
            )))
          }
        };
        Ok((name, value))
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Query::Pairs(pairs))
  }

  fn encode(&self) -> String {
    match self {
      Query::None => String::new(),
      Query::Raw(raw) => raw.trim_start_matches(&['?', '&'][..]).to_string(),
      Query::Pairs(pairs) => url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish(),
    }
  }
}

/// Merge `query` into `url`, respecting an existing `?`.
pub fn with_query(url: &str, query: &Query) -> String {
  let query_string = query.encode();
  if query_string.is_empty() {
    return url.to_string();
  }

  if url.contains('?') {
    let mut merged = format!("{}&{}", url, query_string);
    while merged.contains("&&") {
      merged = merged.replace("&&", "&");
    }
    merged
  } else {
    format!("{}?{}", url, query_string)
  }
}

/// Append `/` to a URL without a query string unless it already ends in one.
pub fn ensure_trailing_slash(url: String) -> String {
  if url.contains('?') || url.ends_with('/') {
    url
  } else {
    url + "/"
  }
}

/// Absolute URL for `relative`, joined onto `base` unless already absolute.
pub fn resolve(base: Option<&Url>, relative: &str) -> Result<String> {
  let trimmed = relative.trim();
  if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
    return Ok(trimmed.to_string());
  }

  let base = base.ok_or_else(|| {
    FetchError::InvalidArgument(format!(
      "relative URL '{}' needs api.base_url to be configured",
      relative
    ))
  })?;

  Ok(format!(
    "{}/{}",
    base.as_str().trim_end_matches('/'),
    trimmed.trim_start_matches('/')
  ))
}
