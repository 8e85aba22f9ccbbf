//! Lifecycle error types.

use rombridge_library_store::StoreError;
use rombridge_protocol::GameStatus;
use rombridge_remote_ops::OpsError;

/// Errors produced by lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Another operation on the same game is still running.
    #[error("operation already in progress for game {0}")]
    Busy(String),

    /// The game's current status does not allow the requested operation.
    #[error("game {game_id} is {status}, cannot {operation}")]
    InvalidState {
        game_id: String,
        status: GameStatus,
        operation: &'static str,
    },

    #[error(transparent)]
    Remote(#[from] OpsError),

    #[error("library store error: {0}")]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LifecycleError::Remote(OpsError::Cancelled))
    }
}
