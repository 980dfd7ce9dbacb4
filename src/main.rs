use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use resilient_fetch::config::Config;
use resilient_fetch::platform::Notifier;
use resilient_fetch::{CachePolicy, Method, OnError, Query, RequestBody};

#[derive(Parser, Debug)]
#[command(name = "rfetch")]
#[command(about = "Offline-tolerant HTTP client with a persistent response cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/rfetch/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Keep cache and queue in memory for this run only
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Read a URL through the cache
  Get(GetArgs),
  /// Send a write request
  Send(SendArgs),
  /// Show the offline queue of an entity type
  Queue {
    type_tag: String,
  },
  /// Replay the offline queue of an entity type
  Drain {
    type_tag: String,
    /// Retry items that were rejected before
    #[arg(long)]
    include_rejected: bool,
  },
  /// Remove cached responses
  ClearCache {
    /// Only clear this type's entry for --url
    #[arg(long = "type", requires = "url")]
    type_tag: Option<String>,
    #[arg(long, requires = "type_tag")]
    url: Option<String>,
  },
}

#[derive(ClapArgs, Debug)]
struct GetArgs {
  url: String,
  /// Cache bucket for the response
  #[arg(long = "type", default_value = "response")]
  type_tag: String,
  #[arg(long, default_value = "accept")]
  policy: CachePolicy,
  /// Query parameter as key=value (repeatable)
  #[arg(short, long = "query", value_parser = parse_pair)]
  query: Vec<(String, String)>,
}

#[derive(ClapArgs, Debug)]
struct SendArgs {
  method: Method,
  url: String,
  /// JSON request body
  #[arg(long, conflicts_with = "data")]
  json: Option<String>,
  /// Raw request body
  #[arg(long)]
  data: Option<String>,
  #[arg(long)]
  content_type: Option<String>,
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
  raw
    .split_once('=')
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

/// Prints notices to stderr so they do not mix with command output.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
  fn toast(&self, message: &str) {
    eprintln!("{}", message);
  }

  fn alert(&self, message: &str) {
    eprintln!("error: {}", message);
  }

  fn busy(&self, _show: bool) {}
}

fn init_logging() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("rfetch")
    .join("logs");
  std::fs::create_dir_all(&log_dir)?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
    log_dir,
    "rfetch.log",
  ));
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("resilient_fetch=info,rfetch=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = init_logging()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let client = config
    .client_builder(args.ephemeral)?
    .notifier(Arc::new(ConsoleNotifier))
    .build();

  match args.command {
    Command::Get(get) => {
      let query = if get.query.is_empty() {
        Query::None
      } else {
        Query::Pairs(get.query)
      };
      let value: Option<serde_json::Value> = client
        .fetch_with(&get.type_tag, &get.url, &query, get.policy, None, OnError::Alert)
        .await?;
      print_json(&value)?;
    }
    Command::Send(send) => {
      let body = match (send.json, send.data) {
        (Some(json), _) => RequestBody::Json(
          serde_json::from_str(&json).map_err(|e| eyre!("--json is not valid JSON: {}", e))?,
        ),
        (None, Some(data)) => RequestBody::Text(data),
        (None, None) => RequestBody::Empty,
      };
      let accepted = client
        .mutate_with_content_type(&send.url, send.method, body, send.content_type, OnError::Alert)
        .await?;
      if !accepted {
        return Err(eyre!("{} {} was not accepted", send.method, send.url));
      }
    }
    Command::Queue { type_tag } => {
      print_json(&client.raw_queue(&type_tag).await?)?;
    }
    Command::Drain {
      type_tag,
      include_rejected,
    } => match client.drain_tag(&type_tag, include_rejected).await? {
      Some(report) => print_json(&report)?,
      None => eprintln!("No queue stored for '{}'", type_tag),
    },
    Command::ClearCache { type_tag, url } => match (type_tag, url) {
      (Some(type_tag), Some(url)) => {
        let removed = client.clear_cache_for(&type_tag, &url)?;
        println!("{}", if removed { "removed 1 entry" } else { "no entry" });
      }
      _ => {
        let removed = client.clear_cache()?;
        println!("removed {} entries", removed);
      }
    },
  }

  Ok(())
}
