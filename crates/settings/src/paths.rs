use std::path::{Path, PathBuf};

use rombridge_protocol::constants::{APP_DIR_NAME, CONFIG_FILE_NAME, LIBRARY_FILE_NAME};

/// Per-user data directory holding the config and library files.
///
/// - Linux: `$XDG_CONFIG_HOME/rombridge` or `~/.config/rombridge`
/// - Windows: `%APPDATA%\rombridge`
pub fn default_data_dir() -> Option<PathBuf> {
    platform_config_dir().map(|d| d.join(APP_DIR_NAME))
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE_NAME)
}

pub fn library_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LIBRARY_FILE_NAME)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join(".config"))
    }
}
