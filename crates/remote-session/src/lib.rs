//! Remote shell session for rombridge.
//!
//! Owns exactly one authenticated connection to the remote host and runs
//! shell command lines over it. Every command is an independent channel
//! multiplexed over that connection, so a long streaming transfer does not
//! block short inventory commands.
//!
//! The transport sits behind the [`Connector`] / [`ShellTransport`] traits.
//! [`SshConnector`] is the production implementation; tests script their
//! own transports.

pub mod error;
pub(crate) mod pumps;
pub mod registry;
pub mod session;
pub mod ssh;
pub mod transport;

pub use error::SessionError;
pub use registry::ActiveTransfers;
pub use session::RemoteSession;
pub use ssh::{HostKeyPolicy, SshConnector, SshOptions};
pub use transport::{
    BoxFuture, Connector, ExitStatus, ProcessIo, ProcessOutput, RemoteProcess, ShellTransport,
    process_channel,
};
