//! Game install lifecycle for rombridge.
//!
//! [`LibraryOrchestrator`] is the state machine that moves each game
//! through download, extract and delete, persisting every transition to
//! the [`LibraryStore`](rombridge_library_store::LibraryStore) and
//! reporting progress on an event channel. [`reconcile`] resyncs stored
//! state against what is actually on the remote host.
//!
//! [`reconcile`]: LibraryOrchestrator::reconcile
//!
//! # Transitions
//!
//! ```text
//! NOT_INSTALLED --download--> DOWNLOADING --ok--> DOWNLOADED
//! EXTRACTED_NO_ZIP --download--> DOWNLOADING --ok--> EXTRACTED
//!                             DOWNLOADING --fail/cancel--> (prior)
//! DOWNLOADED|EXTRACTED --extract--> EXTRACTING --ok--> EXTRACTED
//!                         EXTRACTING --fail--> (prior)
//! delete(archive, folder): derived by GameStatus::after_delete
//! ```
//!
//! Any other starting status is refused with
//! [`LifecycleError::InvalidState`].

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::LifecycleError;
pub use orchestrator::LibraryOrchestrator;
pub use types::{DeleteSelection, LifecycleEvent, ReconcileReport};
