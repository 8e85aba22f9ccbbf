use std::fmt;

use crate::constants::DEFAULT_SSH_PORT;

/// Everything needed to open a remote session.
///
/// Deliberately not serializable: the secret is re-entered every session
/// and only host, port and username are remembered in the config.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub secret: String,
}

impl ConnectionDescriptor {
    pub fn new(
        host: impl Into<String>,
        port: Option<u16>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.unwrap_or(DEFAULT_SSH_PORT),
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// `host:port`, for logging and socket addressing.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}
