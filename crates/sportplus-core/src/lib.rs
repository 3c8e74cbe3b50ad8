//! Core types and trait definitions for Sport Plus progress tracking.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines the content tree (courses, classes, lessons, exercises) as seen by
//! the progress engine, the per-client progress tree that mirrors it, and the
//! two storage abstractions the engine is written against.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod content;
pub mod error;
pub mod id;
pub mod progress;
pub mod status;
pub mod store;

pub use error::{Error, Result};
pub use status::Status;
