//! Remote operation errors.

use rombridge_remote_session::SessionError;

/// Errors surfaced by remote filesystem actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpsError {
    #[error("not connected")]
    NotConnected,

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("cancelled")]
    Cancelled,

    #[error("remote command failed: {0}")]
    Command(String),

    /// A path or file name that cannot be safely put on a command line.
    #[error("invalid remote path: {0:?}")]
    InvalidPath(String),
}

impl From<SessionError> for OpsError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotConnected => OpsError::NotConnected,
            SessionError::Cancelled => OpsError::Cancelled,
            SessionError::Command(msg) => OpsError::Command(msg),
            other @ (SessionError::Connection(_) | SessionError::Transport(_)) => {
                OpsError::Command(other.to_string())
            }
        }
    }
}
