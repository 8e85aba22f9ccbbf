use std::time::Duration;

/// Base URL prepended to catalog resource paths that are not absolute URLs.
pub const DEFAULT_RESOURCE_BASE_URL: &str = "https://archive.org";

/// Default SSH port used when neither the caller nor the config supplies one.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Time allowed for the SSH handshake and authentication to complete.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// Extracted folder names must be strictly longer than this before the
/// folder is removed recursively. Guards the install root against empty or
/// degenerate catalog entries.
pub const MIN_FOLDER_NAME_LEN: usize = 2;

/// Name of the per-user data directory.
pub const APP_DIR_NAME: &str = "rombridge";

/// File name of the persisted connection config.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// File name of the persisted library state.
pub const LIBRARY_FILE_NAME: &str = "library-store.json";

/// Capacity of the lifecycle event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
