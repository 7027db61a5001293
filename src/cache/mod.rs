//! Shared local cache visible to both the application process and the
//! widget-rendering process.
//!
//! The storage trait keeps the persistence backend injectable: SQLite (WAL)
//! in production, an in-memory map in tests. The typed layer owns the
//! well-known keys and recovers from corrupt blobs by resetting them.

mod quotes;
mod store;

pub use quotes::QuoteCache;
pub use store::{MemoryCache, SharedCache, SqliteCache};
