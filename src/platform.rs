//! Host collaborators consumed by the fetch core.
//!
//! Everything the core needs from the surrounding application that is not
//! HTTP or storage: reachability, the session token, wall-clock time and
//! user-facing notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{FetchError, Result};

/// Reachability check used to tell "offline" apart from a failing server.
#[async_trait]
pub trait NetworkProbe: Send + Sync {
  async fn is_reachable(&self) -> bool;
}

/// Probes connectivity by opening a TCP connection to a well-known address.
pub struct TcpProbe {
  address: SocketAddr,
  timeout: Duration,
}

impl TcpProbe {
  pub fn new(address: SocketAddr, timeout: Duration) -> Self {
    Self { address, timeout }
  }
}

#[async_trait]
impl NetworkProbe for TcpProbe {
  async fn is_reachable(&self) -> bool {
    match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(self.address)).await {
      Ok(Ok(_)) => true,
      Ok(Err(e)) => {
        debug!(address = %self.address, error = %e, "Reachability probe failed");
        false
      }
      Err(_) => {
        debug!(address = %self.address, "Reachability probe timed out");
        false
      }
    }
  }
}

/// Supplies the bearer token attached to each request.
pub trait SessionTokenProvider: Send + Sync {
  fn session_token(&self) -> Option<String>;
}

impl<F> SessionTokenProvider for F
where
  F: Fn() -> Option<String> + Send + Sync,
{
  fn session_token(&self) -> Option<String> {
    self()
  }
}

/// Default token source: an environment variable, then a locally stored file.
pub struct StoredTokenProvider {
  env_var: &'static str,
  file: Option<PathBuf>,
}

impl StoredTokenProvider {
  pub const ENV_VAR: &'static str = "RFETCH_SESSION_TOKEN";

  pub fn new(file: Option<PathBuf>) -> Self {
    Self {
      env_var: Self::ENV_VAR,
      file,
    }
  }

  /// `<data_dir>/rfetch/SessionToken.txt`
  pub fn default_file() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("rfetch").join("SessionToken.txt"))
  }
}

impl SessionTokenProvider for StoredTokenProvider {
  fn session_token(&self) -> Option<String> {
    let from_env = std::env::var(self.env_var).ok();
    let from_file = || {
      self
        .file
        .as_ref()
        .and_then(|path| std::fs::read_to_string(path).ok())
    };

    from_env
      .or_else(from_file)
      .map(|token| token.trim().to_string())
      .filter(|token| !token.is_empty())
  }
}

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// User-facing feedback (toasts, alerts, busy indicator).
pub trait Notifier: Send + Sync {
  fn toast(&self, message: &str);

  fn alert(&self, message: &str) {
    self.toast(message);
  }

  fn busy(&self, show: bool);
}

/// Notifier for headless hosts: every notice becomes a log line.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn toast(&self, message: &str) {
    info!(notice = message, "toast");
  }

  fn alert(&self, message: &str) {
    warn!(notice = message, "alert");
  }

  fn busy(&self, _show: bool) {}
}

/// What to do with a failure that was not recovered locally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnError {
  /// Log and carry on
  Ignore,
  /// Non-blocking notice
  #[default]
  Toast,
  /// Blocking notice
  Alert,
  /// Hand the error back to the caller
  Throw,
}

impl OnError {
  /// Apply this policy to `err`. Only `Throw` returns `Err`.
  pub fn apply(self, err: FetchError, notifier: &dyn Notifier) -> Result<()> {
    error!(error = %err, action = ?self, "Request failed");
    match self {
      OnError::Ignore => Ok(()),
      OnError::Toast => {
        notifier.toast(&err.friendly_message());
        Ok(())
      }
      OnError::Alert => {
        notifier.alert(&err.friendly_message());
        Ok(())
      }
      OnError::Throw => Err(err),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::RecordingNotifier;

  #[test]
  fn test_closure_token_provider() {
    let provider = || Some("abc".to_string());
    assert_eq!(provider.session_token().as_deref(), Some("abc"));
  }

  #[test]
  fn test_stored_token_ignores_blank_file() {
    let dir = std::env::temp_dir().join(format!("rfetch-token-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let file = dir.join("SessionToken.txt");
    std::fs::write(&file, "  \n").unwrap();

    let provider = StoredTokenProvider {
      env_var: "RFETCH_TEST_TOKEN_THAT_IS_NEVER_SET",
      file: Some(file.clone()),
    };
    assert_eq!(provider.session_token(), None);

    std::fs::write(&file, "secret\n").unwrap();
    assert_eq!(provider.session_token().as_deref(), Some("secret"));

    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_on_error_policies() {
    let notifier = RecordingNotifier::default();

    assert!(OnError::Ignore
      .apply(FetchError::NetworkUnavailable, &notifier)
      .is_ok());
    assert!(notifier.toasts().is_empty());

    assert!(OnError::Toast
      .apply(FetchError::Transport("refused".into()), &notifier)
      .is_ok());
    assert_eq!(notifier.toasts().len(), 1);

    assert!(OnError::Alert
      .apply(FetchError::NetworkUnavailable, &notifier)
      .is_ok());
    assert_eq!(notifier.alerts(), vec!["Internet connection is unavailable."]);

    let thrown = OnError::Throw.apply(FetchError::InvalidArgument("x".into()), &notifier);
    assert!(matches!(thrown, Err(FetchError::InvalidArgument(_))));
  }
}
