//! The progress engine: keeps each client's progress tree in step with the
//! content tree and applies explicit status changes.
//!
//! [`ProgressEngine`] is generic over a [`ProgressStore`] and a
//! [`ContentStore`]. Reads go through the [`reconcile`] pass, which backfills
//! any status node the content tree has gained since the client last looked.
//! Writes go through [`mutate`], which touches the target node and the
//! minimum set of ancestors it needs, and nothing else.
//!
//! [`ProgressStore`]: sportplus_core::store::ProgressStore
//! [`ContentStore`]: sportplus_core::store::ContentStore

pub mod engine;
pub mod error;
pub mod mutate;
pub mod reconcile;

pub use engine::ProgressEngine;
pub use error::{Error, Result};
pub use mutate::Updated;
pub use reconcile::{BrokenReference, ReconcileReport, Reconciled};

#[cfg(test)]
mod tests;
