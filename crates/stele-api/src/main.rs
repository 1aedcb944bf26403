//! Stele server binary.
//!
//! Reads `config.toml` (or the path given with `--config`, with `STELE_`
//! environment overrides), opens the SQLite store, spawns the transfer-job
//! worker, and serves the repository API over HTTP.

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use stele_api::{AppState, ServerConfig, TransferJob};
use stele_core::Repository;
use stele_store_sqlite::SqliteStorage;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Stele resource repository server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: std::path::PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("STELE"))
    .build()
    .context("failed to read config file")?;
  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let storage = SqliteStorage::open(&server_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", server_cfg.store_path)
    })?;

  let repo = Repository::new(
    storage,
    server_cfg.base_url.clone(),
    server_cfg.policy.clone(),
    server_cfg.history,
  );

  // Transfer jobs are fire-and-forget; the worker just records them. Wiring
  // an actual downstream queue happens at deploy time.
  let (transfer_tx, transfer_rx) = mpsc::channel::<TransferJob>(64);
  tokio::spawn(drain_transfers(transfer_rx));

  let state = AppState { repo: Arc::new(repo), transfer: transfer_tx };
  let app = stele_api::router(state);

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn drain_transfers(mut rx: mpsc::Receiver<TransferJob>) {
  while let Some(job) = rx.recv().await {
    tracing::info!(
      resource = %job.resource_uri,
      group    = %job.group,
      target   = %job.target,
      "transfer job accepted"
    );
  }
}
