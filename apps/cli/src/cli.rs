//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use rombridge_protocol::ConnectionDescriptor;
use rombridge_remote_session::HostKeyPolicy;
use rombridge_settings::AppConfig;

/// Environment variable holding the SSH password.
pub const PASSWORD_ENV: &str = "ROMBRIDGE_PASSWORD";

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage a ROM library on a remote host over SSH")]
pub struct Cli {
    /// Catalog JSON file.
    #[arg(long)]
    pub catalog: PathBuf,

    /// Source name within the catalog.
    #[arg(long)]
    pub source: String,

    /// Remote host. Defaults to the last successful connection.
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub user: Option<String>,

    /// Directory for config.json and library-store.json.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Verify the server key against ~/.ssh/known_hosts.
    #[arg(long)]
    pub known_hosts: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the stored status of every game in the source.
    Status,
    /// Reconcile stored status with the remote directories.
    Sync,
    /// Download a game's archive. Ctrl-C cancels.
    Download { game: String },
    /// Expand a downloaded archive.
    Extract { game: String },
    /// Delete a game's archive and/or extracted folder.
    Delete {
        game: String,
        #[arg(long)]
        archive: bool,
        #[arg(long)]
        folder: bool,
    },
}

impl Cli {
    pub fn host_key_policy(&self) -> HostKeyPolicy {
        if self.known_hosts {
            HostKeyPolicy::KnownHosts
        } else {
            HostKeyPolicy::AcceptAny
        }
    }

    /// Connection settings from flags, falling back to the remembered
    /// config.
    pub fn descriptor(
        &self,
        config: &AppConfig,
        secret: Option<String>,
    ) -> anyhow::Result<ConnectionDescriptor> {
        let host = self
            .host
            .clone()
            .or_else(|| config.ssh_host.clone())
            .context("no host given and none remembered; pass --host")?;
        let user = self
            .user
            .clone()
            .or_else(|| config.ssh_user.clone())
            .context("no user given and none remembered; pass --user")?;
        let Some(secret) = secret else {
            bail!("{PASSWORD_ENV} is not set");
        };
        Ok(ConnectionDescriptor::new(
            host,
            self.port.or(config.ssh_port),
            user,
            secret,
        ))
    }
}
