//! Lifecycle event and report types.

use rombridge_protocol::GameStatus;

/// Events emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Fetch progress for a download.
    Progress {
        operation_id: String,
        game_id: String,
        percent: u8,
    },
    /// A status transition was persisted.
    StatusChanged { game_id: String, status: GameStatus },
    /// An operation failed (cancellation included).
    Failed { game_id: String, error: String },
}

/// Which parts of an installed game to delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSelection {
    pub archive: bool,
    pub folder: bool,
}

impl DeleteSelection {
    pub fn new(archive: bool, folder: bool) -> Self {
        Self { archive, folder }
    }

    pub fn everything() -> Self {
        Self::new(true, true)
    }

    pub fn archive_only() -> Self {
        Self::new(true, false)
    }

    pub fn folder_only() -> Self {
        Self::new(false, true)
    }

    pub fn is_empty(&self) -> bool {
        !self.archive && !self.folder
    }
}

/// Outcome of a reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Games whose stored status changed, with the new status.
    pub updated: Vec<(String, GameStatus)>,
    pub unchanged: usize,
    /// Games left alone because an operation on them was in flight.
    pub skipped: Vec<String>,
}
