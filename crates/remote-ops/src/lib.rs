//! Remote filesystem actions for rombridge.
//!
//! Translates domain actions (list a directory, fetch an archive, expand
//! it, delete a path, test existence) into POSIX shell command lines and
//! runs them over a [`RemoteSession`](rombridge_remote_session::RemoteSession).

pub mod commands;
pub mod error;
pub mod ops;
pub mod progress;

pub use error::OpsError;
pub use ops::{FetchRequest, ProgressFn, RemoteFs, RemoteOps};
pub use progress::parse_percent;
pub use rombridge_remote_session::BoxFuture;
