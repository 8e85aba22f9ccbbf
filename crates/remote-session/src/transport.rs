//! Transport seam between the session and the wire.
//!
//! A [`Connector`] opens a [`ShellTransport`]; the transport spawns one
//! [`RemoteProcess`] per command line. Output and the kill request travel
//! over plain tokio channels, so transports and tests share the same
//! plumbing.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use rombridge_protocol::ConnectionDescriptor;

use crate::error::SessionError;

/// Boxed future returned by the transport traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opens authenticated transports.
pub trait Connector: Send + Sync {
    /// Connects and authenticates. Every call yields a fresh transport.
    fn connect<'a>(
        &'a self,
        descriptor: &'a ConnectionDescriptor,
    ) -> BoxFuture<'a, Result<Arc<dyn ShellTransport>, SessionError>>;
}

/// An open connection able to run shell command lines.
pub trait ShellTransport: Send + Sync {
    /// Starts `command` on its own channel.
    fn spawn<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<RemoteProcess, SessionError>>;

    /// Closes the connection. Safe to call more than once.
    fn close(&self) -> BoxFuture<'_, ()>;

    /// True once the connection is gone, whichever side closed it.
    fn is_closed(&self) -> bool;
}

/// How a remote process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    Code(u32),
    /// Terminated by a signal, e.g. `"KILL"`.
    Signal(String),
    /// The channel closed without reporting a status.
    Unknown,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }

    /// True when the process was killed with SIGKILL.
    pub fn killed(&self) -> bool {
        matches!(self, ExitStatus::Signal(name) if name == "KILL")
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "code {code}"),
            ExitStatus::Signal(name) => write!(f, "signal {name}"),
            ExitStatus::Unknown => f.write_str("unknown status"),
        }
    }
}

/// One event from a running remote process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutput {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    /// Always the last event.
    Exited(ExitStatus),
}

/// Transport side of a process: where output goes and where kill requests
/// arrive.
pub struct ProcessIo {
    pub output: mpsc::Sender<ProcessOutput>,
    pub kill: oneshot::Receiver<()>,
}

/// Creates a connected [`ProcessIo`] / [`RemoteProcess`] pair.
pub fn process_channel(capacity: usize) -> (ProcessIo, RemoteProcess) {
    let (output_tx, output_rx) = mpsc::channel(capacity);
    let (kill_tx, kill_rx) = oneshot::channel();
    (
        ProcessIo {
            output: output_tx,
            kill: kill_rx,
        },
        RemoteProcess {
            output: output_rx,
            kill: Some(kill_tx),
        },
    )
}

/// Session side of a running remote command.
pub struct RemoteProcess {
    output: mpsc::Receiver<ProcessOutput>,
    kill: Option<oneshot::Sender<()>>,
}

impl RemoteProcess {
    /// A process whose whole output is known up front.
    pub fn from_outputs(outputs: Vec<ProcessOutput>) -> Self {
        let (io, process) = process_channel(outputs.len().max(1));
        for output in outputs {
            // Capacity covers every item.
            let _ = io.output.try_send(output);
        }
        process
    }

    /// Next output event, or `None` once the transport side is gone.
    pub async fn next(&mut self) -> Option<ProcessOutput> {
        self.output.recv().await
    }

    /// Asks the transport to kill the process. Returns false if a kill was
    /// already requested or the transport stopped listening.
    pub fn kill(&mut self) -> bool {
        match self.kill.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}
