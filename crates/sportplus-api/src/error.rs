//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<sportplus_engine::Error> for ApiError {
  fn from(e: sportplus_engine::Error) -> Self {
    use sportplus_engine::Error;
    match e {
      Error::InvalidIdentifier(_) => ApiError::BadRequest(e.to_string()),
      Error::CourseNotFound(_) | Error::UnknownContent(_) => ApiError::NotFound(e.to_string()),
      Error::Store(_) | Error::Content(_) => ApiError::Store(Box::new(e)),
    }
  }
}

/// Malformed path ids and unknown status literals.
impl From<sportplus_core::Error> for ApiError {
  fn from(e: sportplus_core::Error) -> Self { ApiError::BadRequest(e.to_string()) }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { ApiError::BadRequest(e.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use sportplus_core::id::CourseId;

  use super::*;

  fn status_of(e: sportplus_engine::Error) -> StatusCode {
    ApiError::from(e).into_response().status()
  }

  #[test]
  fn engine_errors_map_to_http_status() {
    use sportplus_engine::Error;

    assert_eq!(
      status_of(Error::InvalidIdentifier("lesson 100 does not belong to class 11".into())),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status_of(Error::CourseNotFound(CourseId::new(3).unwrap())),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status_of(Error::UnknownContent("class 9".into())),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status_of(Error::Store("disk full".into())),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn core_errors_are_bad_requests() {
    let err = "abc".parse::<CourseId>().unwrap_err();
    assert_eq!(
      ApiError::from(err).into_response().status(),
      StatusCode::BAD_REQUEST
    );
  }
}
