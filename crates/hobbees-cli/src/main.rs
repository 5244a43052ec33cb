//! `hobbees`: command-line client for the HobBees hobby tracker.
//!
//! # Usage
//!
//! ```
//! hobbees login alice
//! hobbees hobby create Knitting --description "Yarn and needles"
//! hobbees category add Knitting Yarn Brand:text:required InStock:boolean
//! hobbees item add Knitting Yarn Brand="Lion Brand" InStock=yes
//! hobbees hobby show Knitting
//! hobbees shell
//! ```
//!
//! Settings come from `--config` (default `~/.config/hobbees/config.toml`),
//! then `HOBBEES_*` environment variables, then flags.

mod app;
mod command;

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use app::App;
use clap::Parser;
use command::Command;
use hobbees_client::{ApiClient, ApiConfig, FileCredentials};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "hobbees", version, about = "Track hobbies with custom categories")]
struct Cli {
  /// Path to a TOML config file (url, timeout_secs, credentials_path).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the HobBees server (default: http://localhost:8000).
  #[arg(long, env = "HOBBEES_URL")]
  url: Option<String>,

  /// Request timeout in seconds (default: 30).
  #[arg(long, value_name = "SECS")]
  timeout: Option<u64>,

  /// Answer yes to every confirmation prompt.
  #[arg(short, long, global = true)]
  yes: bool,

  #[command(subcommand)]
  command: Command,
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct Settings {
  #[serde(default = "default_url")]
  url:              String,
  #[serde(default = "default_timeout")]
  timeout_secs:     u64,
  #[serde(default)]
  credentials_path: Option<PathBuf>,
}

fn default_url() -> String { ApiConfig::default().base_url }

fn default_timeout() -> u64 { ApiConfig::default().timeout.as_secs() }

fn default_config_path() -> PathBuf {
  expand_tilde(&PathBuf::from("~/.config/hobbees/config.toml"))
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
  let (path, required) = match &cli.config {
    Some(path) => (expand_tilde(path), true),
    None => (default_config_path(), false),
  };
  let settings = config::Config::builder()
    .add_source(config::File::from(path.clone()).required(required))
    .add_source(config::Environment::with_prefix("HOBBEES"))
    .build()
    .with_context(|| format!("failed to read config file {}", path.display()))?;

  let mut settings: Settings = settings
    .try_deserialize()
    .context("failed to deserialise settings")?;

  // Flags override the file and environment.
  if let Some(url) = &cli.url {
    settings.url = url.clone();
  }
  if let Some(timeout) = cli.timeout {
    settings.timeout_secs = timeout;
  }
  settings.credentials_path = settings.credentials_path.map(|p| expand_tilde(&p));
  Ok(settings)
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = load_settings(&cli)?;
  tracing::debug!(?settings, "loaded settings");

  let client = ApiClient::new(ApiConfig {
    base_url: settings.url,
    timeout:  Duration::from_secs(settings.timeout_secs),
  })
  .context("failed to create API client")?;
  let store = settings
    .credentials_path
    .map_or_else(FileCredentials::default, FileCredentials::new);

  let mut app = App::new(client, store, cli.yes);
  app.restore().await;
  app.run(cli.command).await
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &std::path::Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
