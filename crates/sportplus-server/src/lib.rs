//! HTTP server for Sport Plus progress tracking.
//!
//! Wires a [`SqliteStore`] (serving as both the progress store and the
//! content store) into a [`ProgressEngine`] and exposes it through
//! [`sportplus_api::api_router`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{Router, routing::get};
use serde::Deserialize;
use sportplus_engine::ProgressEngine;
use sportplus_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SPORTPLUS_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// `store_path` with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

pub type Engine = ProgressEngine<SqliteStore, SqliteStore>;

/// Build an engine over a single store handle.
pub fn engine(store: SqliteStore) -> Arc<Engine> {
  Arc::new(ProgressEngine::new(store.clone(), store))
}

/// The full application router: the progress API plus a liveness probe, with
/// request tracing.
pub fn router(engine: Arc<Engine>) -> Router {
  Router::new()
    .route("/health", get(health))
    .merge(sportplus_api::api_router(engine))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }
