//! Application settings for rombridge.
//!
//! The config file remembers the last successful connection (never its
//! secret) and the legacy per-source folder mapping. It lives next to the
//! library state in the per-user data directory.

mod config;
mod paths;

pub use config::{AppConfig, ConfigError, ConfigStore};
pub use paths::{config_path, default_data_dir, library_path};
