//! The remote operations facade.

use std::sync::Arc;

use tracing::{debug, info, warn};

use rombridge_remote_session::{BoxFuture, RemoteSession};

use crate::commands::{self, join_remote};
use crate::error::OpsError;
use crate::progress::parse_percent;

/// Receives fetch progress percentages.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// A resumable fetch of one resource into a remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Correlation key for [`RemoteFs::cancel`].
    pub operation_id: String,
    /// Prefix for `resource`; empty when `resource` is already a full URL.
    pub base_url: String,
    pub resource: String,
    pub destination_dir: String,
    pub file_name: String,
}

impl FetchRequest {
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url, self.resource)
    }

    pub fn destination(&self) -> String {
        join_remote(&self.destination_dir, &self.file_name)
    }
}

/// Remote filesystem actions the lifecycle layer depends on.
///
/// [`RemoteOps`] is the production implementation; keeping the trait
/// separate lets the state machine be tested without a remote host.
pub trait RemoteFs: Send + Sync {
    /// Entry names in `dir`. Empty on any failure.
    fn list_entries<'a>(&'a self, dir: &'a str) -> BoxFuture<'a, Vec<String>>;

    fn fetch_resource<'a>(
        &'a self,
        request: &'a FetchRequest,
        on_progress: ProgressFn,
    ) -> BoxFuture<'a, Result<(), OpsError>>;

    /// Removes a file or directory tree. Missing paths are not an error.
    fn delete_entry<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), OpsError>>;

    /// Expands `archive` into `destination_dir`, overwriting existing files.
    fn expand_archive<'a>(
        &'a self,
        archive: &'a str,
        destination_dir: &'a str,
    ) -> BoxFuture<'a, Result<(), OpsError>>;

    /// False on any failure.
    fn path_exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool>;

    /// Cancels the fetch registered under `operation_id`, if still live.
    fn cancel(&self, operation_id: &str) -> bool;
}

/// Remote filesystem actions over a shared [`RemoteSession`].
pub struct RemoteOps {
    session: Arc<RemoteSession>,
}

impl RemoteOps {
    pub fn new(session: Arc<RemoteSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<RemoteSession> {
        &self.session
    }

    pub async fn list_entries(&self, dir: &str) -> Vec<String> {
        let result = match commands::list(dir) {
            Ok(cmd) => self.session.execute(&cmd).await.map_err(OpsError::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(output) => output
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) => {
                debug!(dir, error = %e, "listing failed, treating as empty");
                Vec::new()
            }
        }
    }

    /// Fetches `request`, reporting every percentage seen on the
    /// downloader's stderr.
    pub async fn fetch_resource<F>(
        &self,
        request: &FetchRequest,
        on_progress: F,
    ) -> Result<(), OpsError>
    where
        F: Fn(u8) + Send,
    {
        let url = request.url();
        let cmd = commands::fetch(&url, &request.destination_dir, &request.file_name)?;
        info!(
            operation_id = %request.operation_id,
            url = %url,
            destination = %request.destination(),
            "fetch started"
        );

        let result = self
            .session
            .execute_streaming(&request.operation_id, &cmd, move |chunk| {
                if let Some(percent) = parse_percent(chunk) {
                    on_progress(percent);
                }
            })
            .await;

        match result.map_err(OpsError::from) {
            Ok(()) => {
                info!(operation_id = %request.operation_id, "fetch finished");
                Ok(())
            }
            Err(OpsError::Command(msg)) => {
                warn!(operation_id = %request.operation_id, error = %msg, "fetch failed");
                Err(OpsError::Transfer(msg))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete_entry(&self, path: &str) -> Result<(), OpsError> {
        let cmd = commands::remove(path)?;
        self.session.execute(&cmd).await?;
        info!(path, "deleted remote entry");
        Ok(())
    }

    pub async fn expand_archive(
        &self,
        archive: &str,
        destination_dir: &str,
    ) -> Result<(), OpsError> {
        let mkdir = commands::make_dir(destination_dir)?;
        let unzip = commands::unzip(archive, destination_dir)?;

        self.session.execute(&mkdir).await?;
        info!(archive, destination = destination_dir, "expanding archive");
        self.session.execute(&unzip).await?;
        Ok(())
    }

    pub async fn path_exists(&self, path: &str) -> bool {
        let Ok(cmd) = commands::exists(path) else {
            return false;
        };
        self.session.execute(&cmd).await.is_ok()
    }

    pub fn cancel(&self, operation_id: &str) -> bool {
        self.session.cancel(operation_id)
    }
}

impl RemoteFs for RemoteOps {
    fn list_entries<'a>(&'a self, dir: &'a str) -> BoxFuture<'a, Vec<String>> {
        Box::pin(RemoteOps::list_entries(self, dir))
    }

    fn fetch_resource<'a>(
        &'a self,
        request: &'a FetchRequest,
        on_progress: ProgressFn,
    ) -> BoxFuture<'a, Result<(), OpsError>> {
        Box::pin(RemoteOps::fetch_resource(self, request, move |p| on_progress(p)))
    }

    fn delete_entry<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), OpsError>> {
        Box::pin(RemoteOps::delete_entry(self, path))
    }

    fn expand_archive<'a>(
        &'a self,
        archive: &'a str,
        destination_dir: &'a str,
    ) -> BoxFuture<'a, Result<(), OpsError>> {
        Box::pin(RemoteOps::expand_archive(self, archive, destination_dir))
    }

    fn path_exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, bool> {
        Box::pin(RemoteOps::path_exists(self, path))
    }

    fn cancel(&self, operation_id: &str) -> bool {
        RemoteOps::cancel(self, operation_id)
    }
}
