//! Error types for `sportplus-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A non-numeric, non-positive or otherwise malformed id.
  #[error("invalid identifier: {0}")]
  InvalidIdentifier(String),

  #[error("unknown status value: {0:?}")]
  UnknownStatus(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
