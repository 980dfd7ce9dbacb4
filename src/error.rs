use thiserror::Error;

/// Failure kinds surfaced by the fetch, mutate and queue operations.
#[derive(Error, Debug)]
pub enum FetchError {
  /// The device has no connectivity. Mutations recover from this by queueing.
  #[error("Internet connection is unavailable.")]
  NetworkUnavailable,

  #[error("{message}")]
  Http { status: u16, message: String },

  /// Connection-level failure while the network is reportedly reachable.
  #[error("Connection to the server failed: {0}")]
  Transport(String),

  #[error("Failed to convert API response to {target}: {source}")]
  Decode {
    target: &'static str,
    #[source]
    source: serde_json::Error,
  },

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),

  #[error("Storage error: {0}")]
  Storage(String),
}

impl FetchError {
  /// First line of the message, suitable for a toast or alert.
  pub fn friendly_message(&self) -> String {
    let message = self.to_string();
    message.lines().next().unwrap_or_default().to_string()
  }
}

pub type Result<T> = std::result::Result<T, FetchError>;
