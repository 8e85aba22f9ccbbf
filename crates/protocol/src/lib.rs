//! Shared domain types for the rombridge workspace.
//!
//! Everything that crosses a crate boundary lives here: the install
//! lifecycle [`GameStatus`], the persisted [`LibraryRecord`], the
//! read-only catalog schema and the [`ConnectionDescriptor`] used to open
//! a remote session.

pub mod catalog;
pub mod connection;
pub mod constants;
pub mod types;

// Re-export primary types for convenience.
pub use catalog::{Catalog, CatalogError, Game, Source};
pub use connection::ConnectionDescriptor;
pub use types::{GameStatus, LibraryData, LibraryRecord};
