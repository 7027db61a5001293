//! Typed access to the remote quote record store.
//!
//! The store is a document collection keyed by calendar date (`YYYY-MM-DD`).
//! A scheduled generation job writes one record per day with per-topic text
//! fields; this client reads those records and mirrors annotation edits back
//! with partial updates. No caching happens here.

pub mod api_types;
mod client;
mod error;
#[cfg(test)]
pub mod memory;

pub use client::{HttpRemoteStore, RemoteStore};
pub use error::RemoteError;
