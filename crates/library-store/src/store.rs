use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use tracing::{debug, info, warn};

use rombridge_protocol::{GameStatus, LibraryData, LibraryRecord};

/// Errors from library persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent map of game id to lifecycle record.
///
/// Reads are served from memory. Every status change is written to disk
/// before [`set_status`](Self::set_status) returns.
pub struct LibraryStore {
    path: PathBuf,
    data: RwLock<LibraryData>,
    // Serializes writers so an older snapshot never lands after a newer one.
    write_lock: Mutex<()>,
}

impl LibraryStore {
    /// Opens the store at `path` and loads it.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let store = Self {
            path,
            data: RwLock::new(LibraryData::default()),
            write_lock: Mutex::new(()),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory state with the file contents.
    ///
    /// A missing or unreadable file yields an empty library. Records left
    /// in an in-flight status by a previous process are reset to
    /// `NotInstalled` and the result is persisted before returning.
    pub fn load(&self) -> Result<(), StoreError> {
        let mut data = read_library(&self.path);
        let reset = reset_transient(&mut data);

        let count = data.games.len();
        *self.data.write().unwrap() = data;
        debug!(path = %self.path.display(), records = count, "library loaded");

        if reset > 0 {
            info!(reset, "reset interrupted operations to NOT_INSTALLED");
            self.save()?;
        }
        Ok(())
    }

    /// Writes the full library to disk through a temp file and rename.
    pub fn save(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let json = {
            let data = self.data.read().unwrap();
            serde_json::to_string_pretty(&*data)?
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = temp_path(&self.path);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "library saved");
        Ok(())
    }

    /// Stored status, or `NotInstalled` when the game has no record.
    pub fn status(&self, game_id: &str) -> GameStatus {
        self.data
            .read()
            .unwrap()
            .games
            .get(game_id)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    /// Upserts the record for `game_id` and persists it.
    ///
    /// If the write fails the in-memory record is restored, so memory never
    /// runs ahead of disk.
    pub fn set_status(
        &self,
        game_id: &str,
        status: GameStatus,
    ) -> Result<LibraryRecord, StoreError> {
        let record = LibraryRecord::new(game_id, status);
        let previous = self
            .data
            .write()
            .unwrap()
            .games
            .insert(game_id.to_string(), record.clone());

        if let Err(e) = self.save() {
            let mut data = self.data.write().unwrap();
            match previous {
                Some(prev) => data.games.insert(game_id.to_string(), prev),
                None => data.games.remove(game_id),
            };
            return Err(e);
        }
        debug!(game = game_id, %status, "status persisted");
        Ok(record)
    }

    /// Snapshot of every record.
    pub fn all(&self) -> BTreeMap<String, LibraryRecord> {
        self.data.read().unwrap().games.clone()
    }
}

fn read_library(path: &Path) -> LibraryData {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return LibraryData::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read library, starting empty");
            return LibraryData::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt library file, starting empty");
            LibraryData::default()
        }
    }
}

/// Resets in-flight statuses. Returns how many records changed.
fn reset_transient(data: &mut LibraryData) -> usize {
    let mut reset = 0;
    for (id, record) in data.games.iter_mut() {
        if record.status.is_transient() {
            debug!(game = %id, status = %record.status, "stale in-flight status");
            *record = LibraryRecord::new(id.as_str(), GameStatus::NotInstalled);
            reset += 1;
        }
    }
    reset
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, LibraryStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = LibraryStore::open(tmp.path().join("library-store.json")).unwrap();
        (tmp, store)
    }

    #[test]
    fn missing_record_reads_not_installed() {
        let (_tmp, store) = test_store();
        assert_eq!(store.status("g1"), GameStatus::NotInstalled);
        assert!(store.all().is_empty());
        // Nothing is written until the first transition.
        assert!(!store.path().exists());
    }

    #[test]
    fn set_status_is_durable_on_return() {
        let (_tmp, store) = test_store();
        let record = store.set_status("g1", GameStatus::Downloaded).unwrap();
        assert_eq!(record.status, GameStatus::Downloaded);

        let on_disk: LibraryData =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.games["g1"].status, GameStatus::Downloaded);
    }

    #[test]
    fn reset_is_an_overwrite_not_a_removal() {
        let (_tmp, store) = test_store();
        store.set_status("g1", GameStatus::Extracted).unwrap();
        store.set_status("g1", GameStatus::NotInstalled).unwrap();
        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all["g1"].status, GameStatus::NotInstalled);
    }

    #[test]
    fn persist_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("library-store.json");
        {
            let store = LibraryStore::open(path.clone()).unwrap();
            store.set_status("g1", GameStatus::Extracted).unwrap();
            store.set_status("g2", GameStatus::ExtractedNoZip).unwrap();
        }
        let store = LibraryStore::open(path).unwrap();
        assert_eq!(store.status("g1"), GameStatus::Extracted);
        assert_eq!(store.status("g2"), GameStatus::ExtractedNoZip);
    }

    #[test]
    fn load_resets_in_flight_states_and_repersists() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("library-store.json");
        std::fs::write(
            &path,
            r#"{"games": {
                "a": {"id": "a", "status": "DOWNLOADING", "lastUpdated": 1},
                "b": {"id": "b", "status": "EXTRACTING", "lastUpdated": 2},
                "c": {"id": "c", "status": "DOWNLOADED", "lastUpdated": 3}
            }}"#,
        )
        .unwrap();

        let store = LibraryStore::open(path.clone()).unwrap();
        assert_eq!(store.status("a"), GameStatus::NotInstalled);
        assert_eq!(store.status("b"), GameStatus::NotInstalled);
        assert_eq!(store.status("c"), GameStatus::Downloaded);
        assert_eq!(store.all()["c"].last_updated, 3);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("DOWNLOADING"));
        assert!(!on_disk.contains("EXTRACTING"));
    }

    #[test]
    fn clean_load_does_not_rewrite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("library-store.json");
        let contents = r#"{"games":{"c":{"id":"c","status":"DOWNLOADED","lastUpdated":3}}}"#;
        std::fs::write(&path, contents).unwrap();

        let _store = LibraryStore::open(path.clone()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("library-store.json");
        std::fs::write(&path, "{\"games\": {\"a\": ").unwrap();

        let store = LibraryStore::open(path).unwrap();
        assert!(store.all().is_empty());
        store.set_status("a", GameStatus::Downloaded).unwrap();
        assert_eq!(store.status("a"), GameStatus::Downloaded);
    }

    #[test]
    fn reload_picks_up_external_changes() {
        let (_tmp, store) = test_store();
        store.set_status("g1", GameStatus::Downloaded).unwrap();
        std::fs::write(
            store.path(),
            r#"{"games":{"g1":{"id":"g1","status":"EXTRACTED","lastUpdated":5}}}"#,
        )
        .unwrap();
        store.load().unwrap();
        assert_eq!(store.status("g1"), GameStatus::Extracted);
    }

    #[cfg(unix)]
    #[test]
    fn failed_write_rolls_back_memory() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        let path = tmp.path().join("library-store.json");
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        let store = LibraryStore::open(path).unwrap();
        assert!(store.set_status("g1", GameStatus::Downloading).is_err());
        assert_eq!(store.status("g1"), GameStatus::NotInstalled);
        assert!(store.all().is_empty());
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let (tmp, store) = test_store();
        store.set_status("g1", GameStatus::Downloaded).unwrap();
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["library-store.json"]);
    }
}
