//! JSON REST API for Sport Plus progress tracking.
//!
//! Exposes an axum [`Router`] backed by a [`ProgressEngine`] over any
//! [`ProgressStore`] / [`ContentStore`] pair. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .merge(sportplus_api::api_router(engine.clone()))
//! ```

pub mod error;
pub mod progress;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, put},
};
use sportplus_core::store::{ContentStore, ProgressStore};
use sportplus_engine::ProgressEngine;

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<P, C>(engine: Arc<ProgressEngine<P, C>>) -> Router<()>
where
  P: ProgressStore + 'static,
  C: ContentStore + 'static,
{
  Router::new()
    // Reads (reconciling)
    .route("/clients/{client}/progress", get(progress::full::<P, C>))
    .route(
      "/clients/{client}/progress/courses/{course}",
      get(progress::course::<P, C>).put(progress::set_course::<P, C>),
    )
    // Mutations
    .route(
      "/clients/{client}/progress/courses/{course}/classes/{class}",
      put(progress::set_class::<P, C>),
    )
    .route(
      "/clients/{client}/progress/classes/{class}/lessons/{lesson}",
      put(progress::set_lesson::<P, C>),
    )
    .route(
      "/clients/{client}/progress/lessons/{lesson}/exercises/{exercise}",
      put(progress::set_exercise::<P, C>),
    )
    .with_state(engine)
}
