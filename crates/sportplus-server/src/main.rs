//! sportplus server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, and serves the progress API over HTTP.
//!
//! # Loading content
//!
//! Courses and exercises are loaded from a JSON document before serving:
//!
//! ```text
//! cargo run -p sportplus-server -- import content.json
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sportplus_core::content::ContentImport;
use sportplus_server::ServerConfig;
use sportplus_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Sport Plus progress server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Load courses, classes, lessons and exercises from a JSON file.
  Import {
    /// Path to the content document.
    file: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("SPORTPLUS"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = server_cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Import { file } => import(&store, file).await,
    Command::Serve => serve(store, &server_cfg).await,
  }
}

async fn import(store: &SqliteStore, file: PathBuf) -> anyhow::Result<()> {
  let raw = tokio::fs::read_to_string(&file)
    .await
    .with_context(|| format!("failed to read {file:?}"))?;
  let content = ContentImport::from_json(&raw)
    .with_context(|| format!("failed to parse {file:?}"))?;

  let summary = store
    .import_content(content)
    .await
    .context("failed to import content")?;
  tracing::info!(
    exercises = summary.exercises,
    courses = summary.courses,
    classes = summary.classes,
    lessons = summary.lessons,
    attachments = summary.attachments,
    "Imported content from {file:?}"
  );
  Ok(())
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = sportplus_server::router(sportplus_server::engine(store));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
