use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rombridge_protocol::ConnectionDescriptor;

/// Errors from config persistence.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted application settings. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_user: Option<String>,

    /// Legacy per-source remote directory mapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_folders: Option<BTreeMap<String, String>>,

    /// Keys written by other versions, kept so a save does not drop them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AppConfig {
    /// Remembers host, port and username. The secret is never stored.
    pub fn remember_connection(&mut self, descriptor: &ConnectionDescriptor) {
        self.ssh_host = Some(descriptor.host.clone());
        self.ssh_port = Some(descriptor.port);
        self.ssh_user = Some(descriptor.username.clone());
    }

    /// Rebuilds a descriptor from the remembered fields plus a fresh secret.
    ///
    /// `None` unless both host and username are remembered.
    pub fn descriptor(&self, secret: impl Into<String>) -> Option<ConnectionDescriptor> {
        let host = self.ssh_host.as_deref().filter(|h| !h.is_empty())?;
        let user = self.ssh_user.as_deref().filter(|u| !u.is_empty())?;
        Some(ConnectionDescriptor::new(host, self.ssh_port, user, secret))
    }
}

/// Reads and writes [`AppConfig`] at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current config. A missing or corrupt file yields the default.
    pub fn get(&self) -> AppConfig {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return AppConfig::default(),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "cannot read config, using defaults"
                );
                return AppConfig::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "corrupt config, using defaults");
            AppConfig::default()
        })
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    /// Loads, remembers the connection, and saves.
    pub fn remember_connection(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<AppConfig, ConfigError> {
        let mut config = self.get();
        config.remember_connection(descriptor);
        self.save(&config)?;
        Ok(config)
    }
}
