use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::api::{ApiClient, ApiClientBuilder};
use crate::http::ReqwestTransport;
use crate::platform::{StoredTokenProvider, TcpProbe};
use crate::store::{MemoryStorage, SqliteStorage, Storage};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub network: NetworkConfig,
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Base for relative request URLs (e.g. "https://example.com/api/")
  pub base_url: Option<String>,
  pub timeout_secs: u64,
  pub user_agent: String,
  /// File holding the session token (defaults to <data_dir>/rfetch/SessionToken.txt)
  pub token_file: Option<PathBuf>,
  /// Toggle the busy indicator around writes
  pub show_busy: bool,
  /// Append "/" to request URLs without a query string
  pub ensure_trailing_slash: bool,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: None,
      timeout_secs: 30,
      user_agent: format!("rfetch/{}", env!("CARGO_PKG_VERSION")),
      token_file: None,
      show_busy: true,
      ensure_trailing_slash: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
  /// Address dialled to decide whether the device is online
  pub probe_address: String,
  pub probe_timeout_ms: u64,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      probe_address: "1.1.1.1:53".to_string(),
      probe_timeout_ms: 3000,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// SQLite database path (defaults to <data_dir>/rfetch/store.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub refresh_delay_ms: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      refresh_delay_ms: 50,
    }
  }
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./rfetch.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rfetch/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("rfetch.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rfetch").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  pub fn base_url(&self) -> Result<Option<Url>> {
    self
      .api
      .base_url
      .as_deref()
      .map(|raw| Url::parse(raw).map_err(|e| eyre!("Invalid api.base_url '{}': {}", raw, e)))
      .transpose()
  }

  pub fn probe_address(&self) -> Result<SocketAddr> {
    self.network.probe_address.parse().map_err(|e| {
      eyre!(
        "Invalid network.probe_address '{}': {}",
        self.network.probe_address,
        e
      )
    })
  }

  /// Open the configured store, or an in-memory one when `ephemeral`.
  pub fn open_storage(&self, ephemeral: bool) -> Result<Arc<dyn Storage>> {
    if ephemeral {
      return Ok(Arc::new(MemoryStorage::new()));
    }
    let storage = match &self.store.path {
      Some(path) => SqliteStorage::open_at(path)?,
      None => SqliteStorage::open()?,
    };
    Ok(Arc::new(storage))
  }

  /// Client builder wired from this configuration.
  pub fn client_builder(&self, ephemeral: bool) -> Result<ApiClientBuilder> {
    let transport = ReqwestTransport::new(
      Duration::from_secs(self.api.timeout_secs),
      &self.api.user_agent,
    )?;
    let probe = TcpProbe::new(
      self.probe_address()?,
      Duration::from_millis(self.network.probe_timeout_ms),
    );
    let token_file = self
      .api
      .token_file
      .clone()
      .or_else(StoredTokenProvider::default_file);

    let mut builder = ApiClient::builder(Arc::new(transport), self.open_storage(ephemeral)?)
      .probe(Arc::new(probe))
      .session_tokens(Arc::new(StoredTokenProvider::new(token_file)))
      .refresh_delay(Duration::from_millis(self.cache.refresh_delay_ms))
      .show_busy(self.api.show_busy)
      .ensure_trailing_slash(self.api.ensure_trailing_slash);
    if let Some(base_url) = self.base_url()? {
      builder = builder.base_url(base_url);
    }

    Ok(builder)
  }
}
