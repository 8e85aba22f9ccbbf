//! SSH implementation of the transport traits, built on russh.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::Disconnect;
use russh::client::{self, Handle};
use russh_keys::key::PublicKey;
use tracing::{debug, info, warn};

use rombridge_protocol::ConnectionDescriptor;
use rombridge_protocol::constants::CONNECT_TIMEOUT;

use crate::error::SessionError;
use crate::pumps::channel::channel_pump;
use crate::transport::{BoxFuture, Connector, RemoteProcess, ShellTransport, process_channel};

/// Buffered output events per remote process.
const PROCESS_BUFFER: usize = 64;

/// How server host keys are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Trust whatever key the server presents.
    #[default]
    AcceptAny,
    /// Require the key to be listed in the user's `known_hosts`.
    KnownHosts,
}

/// Tunables for [`SshConnector`].
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub host_key_policy: HostKeyPolicy,
    pub connect_timeout: Duration,
    pub keepalive_interval: Option<Duration>,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            host_key_policy: HostKeyPolicy::default(),
            connect_timeout: CONNECT_TIMEOUT,
            keepalive_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// Opens password-authenticated SSH connections.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    options: SshOptions,
}

impl SshConnector {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<SshTransport, SessionError> {
        let config = Arc::new(client::Config {
            keepalive_interval: self.options.keepalive_interval,
            ..Default::default()
        });
        let handler = ClientHandler {
            host: descriptor.host.clone(),
            port: descriptor.port,
            policy: self.options.host_key_policy,
        };

        let address = (descriptor.host.as_str(), descriptor.port);
        let mut handle = client::connect(config, address, handler)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        let authenticated = handle
            .authenticate_password(descriptor.username.as_str(), descriptor.secret.as_str())
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;
        if !authenticated {
            return Err(SessionError::Connection(format!(
                "authentication rejected for user {}",
                descriptor.username
            )));
        }

        info!(
            address = %descriptor.address(),
            user = %descriptor.username,
            "SSH session established"
        );
        Ok(SshTransport { handle })
    }
}

impl Connector for SshConnector {
    fn connect<'a>(
        &'a self,
        descriptor: &'a ConnectionDescriptor,
    ) -> BoxFuture<'a, Result<Arc<dyn ShellTransport>, SessionError>> {
        Box::pin(async move {
            let timeout = self.options.connect_timeout;
            let transport = tokio::time::timeout(timeout, self.open(descriptor))
                .await
                .map_err(|_| {
                    SessionError::Connection(format!(
                        "timed out connecting to {}",
                        descriptor.address()
                    ))
                })??;
            Ok(Arc::new(transport) as Arc<dyn ShellTransport>)
        })
    }
}

struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.policy {
            HostKeyPolicy::AcceptAny => Ok(true),
            HostKeyPolicy::KnownHosts => {
                match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
                    Ok(true) => Ok(true),
                    Ok(false) => {
                        warn!(
                            host = %self.host,
                            port = self.port,
                            "host key not found in known_hosts"
                        );
                        Ok(false)
                    }
                    Err(e) => {
                        warn!(
                            host = %self.host,
                            port = self.port,
                            error = %e,
                            "host key check failed"
                        );
                        Ok(false)
                    }
                }
            }
        }
    }
}

/// One live SSH connection. Each command runs on its own exec channel.
pub struct SshTransport {
    handle: Handle<ClientHandler>,
}

impl ShellTransport for SshTransport {
    fn spawn<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<RemoteProcess, SessionError>> {
        Box::pin(async move {
            let channel = self
                .handle
                .channel_open_session()
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;
            channel
                .exec(true, command)
                .await
                .map_err(|e| SessionError::Transport(e.to_string()))?;

            let (io, process) = process_channel(PROCESS_BUFFER);
            tokio::spawn(channel_pump(channel, io));
            Ok(process)
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.handle.is_closed() {
                return;
            }
            if let Err(e) = self
                .handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
            {
                debug!(error = %e, "SSH disconnect failed");
            }
        })
    }

    fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let opts = SshOptions::default();
        assert_eq!(opts.host_key_policy, HostKeyPolicy::AcceptAny);
        assert_eq!(opts.connect_timeout, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connection_error() {
        let connector = SshConnector::new(SshOptions {
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        });
        // Port 9 on loopback is almost never listening; refusal or timeout
        // both surface as a connection error.
        let desc = ConnectionDescriptor::new("127.0.0.1", Some(9), "nobody", "x");
        let err = connector.connect(&desc).await.err().unwrap();
        assert!(matches!(err, SessionError::Connection(_)));
    }
}
