//! The single remote session shared by every remote operation.

use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use rombridge_protocol::ConnectionDescriptor;

use crate::error::SessionError;
use crate::registry::ActiveTransfers;
use crate::ssh::{SshConnector, SshOptions};
use crate::transport::{Connector, ExitStatus, ProcessOutput, ShellTransport};

/// Upper bound on stderr kept for a streaming command's error message.
const STDERR_TAIL_LIMIT: usize = 16 * 1024;

/// One authenticated connection plus the registry of cancellable streams
/// running over it.
pub struct RemoteSession {
    connector: Arc<dyn Connector>,
    transport: RwLock<Option<Arc<dyn ShellTransport>>>,
    transfers: ActiveTransfers,
}

impl RemoteSession {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            transport: RwLock::new(None),
            transfers: ActiveTransfers::new(),
        }
    }

    /// Session backed by the SSH connector.
    pub fn ssh(options: SshOptions) -> Self {
        Self::new(Arc::new(SshConnector::new(options)))
    }

    /// Opens a fresh connection, closing any previous one first.
    pub async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<(), SessionError> {
        let previous = self.transport.write().unwrap().take();
        if let Some(previous) = previous {
            debug!("closing previous connection");
            previous.close().await;
        }

        info!(address = %descriptor.address(), user = %descriptor.username, "connecting");
        match self.connector.connect(descriptor).await {
            Ok(transport) => {
                *self.transport.write().unwrap() = Some(transport);
                info!(address = %descriptor.address(), "connected");
                Ok(())
            }
            Err(e) => {
                warn!(address = %descriptor.address(), error = %e, "connection failed");
                Err(e)
            }
        }
    }

    /// Closes the connection. No-op when already disconnected.
    pub async fn disconnect(&self) {
        let transport = self.transport.write().unwrap().take();
        if let Some(transport) = transport {
            transport.close().await;
            info!("disconnected");
        }
    }

    /// True while a connection is open and has not been closed remotely.
    pub fn is_connected(&self) -> bool {
        self.transport
            .read()
            .unwrap()
            .as_ref()
            .is_some_and(|t| !t.is_closed())
    }

    /// Runs `command` to completion and returns its stdout.
    pub async fn execute(&self, command: &str) -> Result<String, SessionError> {
        let transport = self.live_transport()?;
        debug!(command, "exec");

        let mut process = transport.spawn(command).await?;
        let mut stdout = String::new();
        let mut stderr = String::new();
        let status = loop {
            match process.next().await {
                Some(ProcessOutput::Stdout(data)) => {
                    stdout.push_str(&String::from_utf8_lossy(&data))
                }
                Some(ProcessOutput::Stderr(data)) => {
                    stderr.push_str(&String::from_utf8_lossy(&data))
                }
                Some(ProcessOutput::Exited(status)) => break status,
                None => break ExitStatus::Unknown,
            }
        };

        if status.success() {
            Ok(stdout)
        } else {
            debug!(command, %status, "command failed");
            Err(SessionError::Command(failure_message(&stderr, &status)))
        }
    }

    /// Runs a long command, handing each stderr chunk to `on_stderr` as it
    /// arrives. The stream can be aborted with [`cancel`](Self::cancel)
    /// using the same `operation_id`.
    ///
    /// A process killed with SIGKILL reports [`SessionError::Cancelled`],
    /// whoever sent the signal.
    pub async fn execute_streaming<F>(
        &self,
        operation_id: &str,
        command: &str,
        mut on_stderr: F,
    ) -> Result<(), SessionError>
    where
        F: FnMut(&str) + Send,
    {
        let transport = self.live_transport()?;
        // Registered before the spawn so a cancel racing the channel open
        // is still honoured.
        let registration = self.transfers.register(operation_id);
        let cancel = registration.token().clone();
        debug!(operation_id, command, "exec streaming");

        let mut process = transport.spawn(command).await?;
        let mut stderr = String::new();
        let status = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    process.kill();
                    info!(operation_id, "stream cancelled");
                    return Err(SessionError::Cancelled);
                }
                output = process.next() => match output {
                    Some(ProcessOutput::Stdout(_)) => {}
                    Some(ProcessOutput::Stderr(data)) => {
                        let text = String::from_utf8_lossy(&data);
                        on_stderr(&*text);
                        push_tail(&mut stderr, &*text);
                    }
                    Some(ProcessOutput::Exited(status)) => break status,
                    None => break ExitStatus::Unknown,
                }
            }
        };
        drop(registration);

        if status.success() {
            Ok(())
        } else if status.killed() {
            info!(operation_id, "remote process was killed");
            Err(SessionError::Cancelled)
        } else {
            debug!(operation_id, %status, "streaming command failed");
            Err(SessionError::Command(failure_message(&stderr, &status)))
        }
    }

    /// Cancels the live stream registered under `operation_id`. Returns
    /// false when nothing was registered under that id.
    pub fn cancel(&self, operation_id: &str) -> bool {
        let cancelled = self.transfers.cancel(operation_id);
        if cancelled {
            info!(operation_id, "cancel requested");
        } else {
            debug!(operation_id, "cancel for unknown operation ignored");
        }
        cancelled
    }

    /// Whether a stream is currently registered under `operation_id`.
    pub fn is_streaming(&self, operation_id: &str) -> bool {
        self.transfers.contains(operation_id)
    }

    fn live_transport(&self) -> Result<Arc<dyn ShellTransport>, SessionError> {
        let mut slot = self.transport.write().unwrap();
        match slot.as_ref() {
            Some(t) if !t.is_closed() => Ok(Arc::clone(t)),
            Some(_) => {
                warn!("connection closed by remote");
                *slot = None;
                Err(SessionError::NotConnected)
            }
            None => Err(SessionError::NotConnected),
        }
    }
}

fn failure_message(stderr: &str, status: &ExitStatus) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("command failed with {status}")
    } else {
        trimmed.to_string()
    }
}

/// Appends `text`, keeping only the last [`STDERR_TAIL_LIMIT`] bytes.
fn push_tail(buf: &mut String, text: &str) {
    buf.push_str(text);
    if buf.len() > STDERR_TAIL_LIMIT {
        let mut cut = buf.len() - STDERR_TAIL_LIMIT;
        while !buf.is_char_boundary(cut) {
            cut += 1;
        }
        buf.drain(..cut);
    }
}
