//! Error type for `sportplus-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sportplus_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An authoring call referenced content that does not exist.
  #[error("{0} not found")]
  ContentNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
