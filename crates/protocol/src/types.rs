use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Install lifecycle of a single game on the remote host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    #[default]
    NotInstalled,
    /// Archive fetch in flight.
    Downloading,
    /// Archive present, nothing extracted.
    Downloaded,
    /// Archive expansion in flight.
    Extracting,
    /// Archive and extracted folder both present.
    Extracted,
    /// Extracted folder present, archive removed.
    ExtractedNoZip,
}

impl GameStatus {
    /// Derives the status from what is present on the remote host.
    pub fn from_presence(has_archive: bool, has_folder: bool) -> Self {
        match (has_archive, has_folder) {
            (true, true) => GameStatus::Extracted,
            (false, true) => GameStatus::ExtractedNoZip,
            (true, false) => GameStatus::Downloaded,
            (false, false) => GameStatus::NotInstalled,
        }
    }

    /// In-flight states that cannot survive a process restart.
    pub fn is_transient(self) -> bool {
        matches!(self, GameStatus::Downloading | GameStatus::Extracting)
    }

    /// Whether this status implies the archive is on the host.
    pub fn has_archive(self) -> bool {
        matches!(self, GameStatus::Downloaded | GameStatus::Extracted)
    }

    /// Whether this status implies the extracted folder is on the host.
    pub fn has_folder(self) -> bool {
        matches!(self, GameStatus::Extracted | GameStatus::ExtractedNoZip)
    }

    /// Status left behind after deleting the archive and/or the extracted
    /// folder.
    ///
    /// Deleting both always resets to `NotInstalled`; deleting neither leaves
    /// the status untouched. Otherwise the result is derived from whatever
    /// the current status says remains on the host.
    pub fn after_delete(self, delete_archive: bool, delete_folder: bool) -> Self {
        match (delete_archive, delete_folder) {
            (true, true) => GameStatus::NotInstalled,
            (false, false) => self,
            _ => GameStatus::from_presence(
                self.has_archive() && !delete_archive,
                self.has_folder() && !delete_folder,
            ),
        }
    }

    /// Persisted name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::NotInstalled => "NOT_INSTALLED",
            GameStatus::Downloading => "DOWNLOADING",
            GameStatus::Downloaded => "DOWNLOADED",
            GameStatus::Extracting => "EXTRACTING",
            GameStatus::Extracted => "EXTRACTED",
            GameStatus::ExtractedNoZip => "EXTRACTED_NO_ZIP",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted lifecycle state of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryRecord {
    pub id: String,
    pub status: GameStatus,
    /// Milliseconds since the Unix epoch.
    pub last_updated: i64,
}

impl LibraryRecord {
    /// Creates a record stamped with the current time.
    pub fn new(id: impl Into<String>, status: GameStatus) -> Self {
        Self {
            id: id.into(),
            status,
            last_updated: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// On-disk layout of the library state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryData {
    #[serde(default)]
    pub games: BTreeMap<String, LibraryRecord>,
}
