use sportplus_core::id::CourseId;
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid identifier: {0}")]
  InvalidIdentifier(String),

  #[error("course {0} not found")]
  CourseNotFound(CourseId),

  #[error("{0} not found")]
  UnknownContent(String),

  #[error("progress store error: {0}")]
  Store(#[source] BoxError),

  #[error("content store error: {0}")]
  Content(#[source] BoxError),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn content(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Content(Box::new(e))
  }

  /// Whether retrying the same call might succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Store(_) | Self::Content(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
