//! Durable library state for rombridge.
//!
//! One [`LibraryRecord`](rombridge_protocol::LibraryRecord) per game id,
//! cached in memory and written through to a JSON file on every change.

mod store;

pub use store::{LibraryStore, StoreError};
