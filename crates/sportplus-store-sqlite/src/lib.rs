//! SQLite backend for Sport Plus.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. A single [`SqliteStore`] implements both
//! the progress store and the (read-only, from the engine's side) content
//! store, and additionally offers content authoring and bulk import.

mod content;
mod encode;
mod schema;
mod store;

pub mod error;

pub use content::ImportSummary;
pub use error::{Error, Result};
pub use store::SqliteStore;
