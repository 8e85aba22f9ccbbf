//! The lifecycle state machine.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use rombridge_library_store::LibraryStore;
use rombridge_protocol::constants::{EVENT_CHANNEL_CAPACITY, MIN_FOLDER_NAME_LEN};
use rombridge_protocol::{Game, GameStatus, LibraryRecord, Source};
use rombridge_remote_ops::commands::join_remote;
use rombridge_remote_ops::{FetchRequest, OpsError, ProgressFn, RemoteFs};

use crate::error::LifecycleError;
use crate::types::{DeleteSelection, LifecycleEvent, ReconcileReport};

/// Drives games through download, extract and delete on the remote host.
///
/// At most one operation per game id runs at a time; a second one fails
/// with [`LifecycleError::Busy`]. Operations on different games may run
/// concurrently over the shared remote connection.
pub struct LibraryOrchestrator {
    remote: Arc<dyn RemoteFs>,
    store: Arc<LibraryStore>,
    events_tx: mpsc::Sender<LifecycleEvent>,
    events_rx: Option<mpsc::Receiver<LifecycleEvent>>,
    in_flight: Mutex<HashSet<String>>,
}

impl LibraryOrchestrator {
    pub fn new(remote: Arc<dyn RemoteFs>, store: Arc<LibraryStore>) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            remote,
            store,
            events_tx,
            events_rx: Some(events_rx),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Takes the event receiver. Can only be called once.
    ///
    /// Events are dropped rather than delaying an operation when the
    /// receiver falls behind; a dropped status or failure event is logged
    /// at `warn`.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<LifecycleEvent>> {
        self.events_rx.take()
    }

    pub fn status(&self, game_id: &str) -> GameStatus {
        self.store.status(game_id)
    }

    pub fn statuses(&self) -> BTreeMap<String, LibraryRecord> {
        self.store.all()
    }

    /// Whether an operation on `game_id` is currently running.
    pub fn is_busy(&self, game_id: &str) -> bool {
        self.in_flight.lock().unwrap().contains(game_id)
    }

    /// Downloads the game's archive into the source's archive directory,
    /// using the game id as the operation id.
    ///
    /// Refused with [`LifecycleError::InvalidState`] while the archive is
    /// already present. An extracted folder left from an earlier install is
    /// kept in the resulting status; a failed or cancelled download restores
    /// the status it started from.
    pub async fn download(&self, source: &Source, game: &Game) -> Result<(), LifecycleError> {
        self.download_with_id(source, game, &game.id).await
    }

    /// Like [`download`](Self::download) with a caller-chosen operation id.
    pub async fn download_with_id(
        &self,
        source: &Source,
        game: &Game,
        operation_id: &str,
    ) -> Result<(), LifecycleError> {
        let _flight = self.begin(&game.id)?;
        let prior = self.store.status(&game.id);
        if prior.has_archive() {
            return Err(invalid_state(&game.id, prior, "download"));
        }
        self.transition(&game.id, GameStatus::Downloading)?;

        let (base_url, resource) = game.resource_location();
        let request = FetchRequest {
            operation_id: operation_id.to_string(),
            base_url: base_url.to_string(),
            resource: resource.to_string(),
            destination_dir: source.zip_path.clone(),
            file_name: game.zip.clone(),
        };
        info!(game = %game.id, operation_id, "download started");

        let progress = self.progress_sink(operation_id, &game.id);
        match self.remote.fetch_resource(&request, progress).await {
            Ok(()) => {
                let next = GameStatus::from_presence(true, prior.has_folder());
                self.transition(&game.id, next)?;
                info!(game = %game.id, status = %next, "download complete");
                Ok(())
            }
            Err(e) => Err(self.fail(&game.id, prior, e)),
        }
    }

    /// Requests cancellation of the game's in-flight download.
    ///
    /// The status is left to the running [`download`](Self::download),
    /// which observes the cancellation and restores the prior status.
    pub fn cancel_download(&self, game: &Game) -> bool {
        self.cancel_operation(&game.id)
    }

    pub fn cancel_operation(&self, operation_id: &str) -> bool {
        let cancelled = self.remote.cancel(operation_id);
        debug!(operation_id, cancelled, "cancel requested");
        cancelled
    }

    /// Expands the game's archive into the source's install directory.
    ///
    /// Requires the archive to be present. On failure the status it
    /// started from (`Downloaded` or `Extracted`) is restored.
    pub async fn extract(&self, source: &Source, game: &Game) -> Result<(), LifecycleError> {
        let _flight = self.begin(&game.id)?;
        let prior = self.store.status(&game.id);
        if !prior.has_archive() {
            return Err(invalid_state(&game.id, prior, "extract"));
        }
        self.transition(&game.id, GameStatus::Extracting)?;

        let archive = join_remote(&source.zip_path, &game.zip);
        info!(game = %game.id, archive = %archive, "extract started");
        match self.remote.expand_archive(&archive, &source.base_path).await {
            Ok(()) => {
                self.transition(&game.id, GameStatus::Extracted)?;
                info!(game = %game.id, "extract complete");
                Ok(())
            }
            Err(e) => Err(self.fail(&game.id, prior, e)),
        }
    }

    /// Deletes the archive and/or extracted folder, then persists the
    /// derived status.
    ///
    /// Folder names of [`MIN_FOLDER_NAME_LEN`] characters or fewer are never
    /// removed. If the second removal fails, the status still reflects the
    /// first one.
    pub async fn delete_data(
        &self,
        source: &Source,
        game: &Game,
        selection: DeleteSelection,
    ) -> Result<GameStatus, LifecycleError> {
        let _flight = self.begin(&game.id)?;
        let current = self.store.status(&game.id);
        if selection.is_empty() {
            return Ok(current);
        }

        let mut done = DeleteSelection::default();
        let result = self.remove_parts(source, game, selection, &mut done).await;

        let next = current.after_delete(done.archive, done.folder);
        if next != current || !done.is_empty() {
            self.transition(&game.id, next)?;
        }

        match result {
            Ok(()) => {
                info!(game = %game.id, status = %next, "delete complete");
                Ok(next)
            }
            Err(e) => Err(self.fail(&game.id, next, e)),
        }
    }

    async fn remove_parts(
        &self,
        source: &Source,
        game: &Game,
        selection: DeleteSelection,
        done: &mut DeleteSelection,
    ) -> Result<(), OpsError> {
        if selection.archive {
            self.remote
                .delete_entry(&join_remote(&source.zip_path, &game.zip))
                .await?;
            done.archive = true;
        }
        if selection.folder {
            if game.folder.len() > MIN_FOLDER_NAME_LEN {
                self.remote
                    .delete_entry(&join_remote(&source.base_path, &game.folder))
                    .await?;
            } else {
                warn!(
                    game = %game.id,
                    folder = %game.folder,
                    "folder name too short, not removing"
                );
            }
            done.folder = true;
        }
        Ok(())
    }

    /// Resyncs stored statuses with the remote archive and install
    /// directories.
    ///
    /// Each directory is listed once. Only games whose derived status
    /// differs from the stored one are written; games with an operation in
    /// flight, or whose status changed while the listings were taken, are
    /// skipped. A failed listing reads as an empty directory, so callers
    /// should reconcile only while connected.
    pub async fn reconcile(&self, source: &Source) -> Result<ReconcileReport, LifecycleError> {
        let before: HashMap<&str, GameStatus> = source
            .games
            .iter()
            .map(|g| (g.id.as_str(), self.store.status(&g.id)))
            .collect();

        let archives: HashSet<String> = self
            .remote
            .list_entries(&source.zip_path)
            .await
            .into_iter()
            .collect();
        let folders: HashSet<String> = self
            .remote
            .list_entries(&source.base_path)
            .await
            .into_iter()
            .collect();
        debug!(archives = archives.len(), folders = folders.len(), "remote inventory");

        let mut report = ReconcileReport::default();
        for game in &source.games {
            let Ok(_flight) = self.begin(&game.id) else {
                report.skipped.push(game.id.clone());
                continue;
            };
            let current = self.store.status(&game.id);
            if before.get(game.id.as_str()) != Some(&current) {
                debug!(game = %game.id, %current, "status changed during listing, skipping");
                report.skipped.push(game.id.clone());
                continue;
            }

            let derived = GameStatus::from_presence(
                archives.contains(&game.zip),
                folders.contains(&game.folder),
            );
            if derived == current {
                report.unchanged += 1;
            } else {
                self.transition(&game.id, derived)?;
                report.updated.push((game.id.clone(), derived));
            }
        }

        info!(
            updated = report.updated.len(),
            unchanged = report.unchanged,
            skipped = report.skipped.len(),
            "reconcile complete"
        );
        Ok(report)
    }

    fn begin(&self, game_id: &str) -> Result<FlightGuard<'_>, LifecycleError> {
        let mut in_flight = self.in_flight.lock().unwrap();
        if !in_flight.insert(game_id.to_string()) {
            debug!(game = game_id, "operation already in flight");
            return Err(LifecycleError::Busy(game_id.to_string()));
        }
        Ok(FlightGuard {
            in_flight: &self.in_flight,
            game_id: game_id.to_string(),
        })
    }

    fn transition(&self, game_id: &str, status: GameStatus) -> Result<(), LifecycleError> {
        self.store.set_status(game_id, status)?;
        info!(game = game_id, %status, "status changed");
        self.emit(LifecycleEvent::StatusChanged {
            game_id: game_id.to_string(),
            status,
        });
        Ok(())
    }

    /// Persists the fallback status after a remote failure and converts
    /// the error. A store failure here is logged; the remote error wins.
    fn fail(&self, game_id: &str, fallback: GameStatus, e: OpsError) -> LifecycleError {
        if self.store.status(game_id) != fallback {
            if let Err(store_err) = self.transition(game_id, fallback) {
                error!(game = game_id, error = %store_err, "failed to persist fallback status");
            }
        }
        if e == OpsError::Cancelled {
            info!(game = game_id, "operation cancelled");
        } else {
            warn!(game = game_id, error = %e, "operation failed");
        }
        self.emit(LifecycleEvent::Failed {
            game_id: game_id.to_string(),
            error: e.to_string(),
        });
        LifecycleError::Remote(e)
    }

    fn progress_sink(&self, operation_id: &str, game_id: &str) -> ProgressFn {
        let tx = self.events_tx.clone();
        let operation_id = operation_id.to_string();
        let game_id = game_id.to_string();
        Arc::new(move |percent| {
            let _ = tx.try_send(LifecycleEvent::Progress {
                operation_id: operation_id.clone(),
                game_id: game_id.clone(),
                percent,
            });
        })
    }

    /// Sends a status or failure event without blocking the operation. A
    /// full channel drops it with a warning.
    fn emit(&self, event: LifecycleEvent) {
        match self.events_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(?event, "event consumer lagging, lifecycle event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event receiver gone");
            }
        }
    }
}

fn invalid_state(game_id: &str, status: GameStatus, operation: &'static str) -> LifecycleError {
    debug!(game = game_id, %status, operation, "operation not allowed in current status");
    LifecycleError::InvalidState {
        game_id: game_id.to_string(),
        status,
        operation,
    }
}

struct FlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    game_id: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().unwrap().remove(&self.game_id);
    }
}
