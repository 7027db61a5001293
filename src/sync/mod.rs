//! Reconciliation of the remote record store with the local history.

mod engine;
mod reconcile;

pub use engine::{AnnotateOutcome, SyncEngine};
