//! Session error types.

/// Errors produced by the remote session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("not connected")]
    NotConnected,

    #[error("connection failed: {0}")]
    Connection(String),

    /// Remote command exited unsuccessfully. Carries the command's stderr,
    /// or a generic message when stderr was empty.
    #[error("command failed: {0}")]
    Command(String),

    #[error("cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),
}
