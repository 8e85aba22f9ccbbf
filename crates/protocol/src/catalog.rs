//! Catalog schema: named sources of games and their remote directories.
//!
//! Catalog data is read-only to the rest of the workspace. It is validated
//! once at the load boundary so later code can join `zip` and `folder`
//! onto remote directories without re-checking them.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_RESOURCE_BASE_URL;

/// Errors produced while loading or validating a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source {source_name}: {reason}")]
    InvalidSource { source_name: String, reason: String },

    #[error("source {source_name}, game {game_id}: {reason}")]
    InvalidGame {
        source_name: String,
        game_id: String,
        reason: String,
    },
}

/// A game entry as published by a catalog source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    /// Archive file name inside the source's `zip_path`.
    pub zip: String,
    /// Absolute URL, or a path relative to [`DEFAULT_RESOURCE_BASE_URL`].
    pub url: String,
    /// Folder name the archive expands to inside the source's `base_path`.
    pub folder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl Game {
    /// Splits the resource location into `(base_url, resource_path)`.
    ///
    /// Absolute `http(s)` URLs get an empty base.
    pub fn resource_location(&self) -> (&str, &str) {
        if self.url.starts_with("http") {
            ("", self.url.as_str())
        } else {
            (DEFAULT_RESOURCE_BASE_URL, self.url.as_str())
        }
    }
}

/// A named collection of games and the remote directories they live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Install directory: archives are expanded here.
    pub base_path: String,
    /// Archive directory: downloads are stored here.
    pub zip_path: String,
    #[serde(default)]
    pub games: Vec<Game>,
}

impl Source {
    /// Looks up a game by id.
    pub fn game(&self, id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == id)
    }

    /// Checks the source and every game in it.
    pub fn validate(&self, source_name: &str) -> Result<(), CatalogError> {
        let source_err = |reason: &str| CatalogError::InvalidSource {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        };

        if self.base_path.trim().is_empty() {
            return Err(source_err("basePath is empty"));
        }
        if self.zip_path.trim().is_empty() {
            return Err(source_err("zipPath is empty"));
        }

        let mut seen = HashSet::new();
        for game in &self.games {
            let game_err = |reason: String| CatalogError::InvalidGame {
                source_name: source_name.to_string(),
                game_id: game.id.clone(),
                reason,
            };

            if game.id.trim().is_empty() {
                return Err(game_err("id is empty".into()));
            }
            if !seen.insert(game.id.as_str()) {
                return Err(game_err("duplicate id".into()));
            }
            if game.url.trim().is_empty() {
                return Err(game_err("url is empty".into()));
            }
            check_path_component("zip", &game.zip).map_err(game_err)?;
            check_path_component("folder", &game.folder).map_err(game_err)?;
        }

        Ok(())
    }
}

/// All sources keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    pub sources: BTreeMap<String, Source>,
}

impl Catalog {
    /// Parses and validates a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validates every source.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (name, source) in &self.sources {
            source.validate(name)?;
        }
        Ok(())
    }

    /// Looks up a source by name.
    pub fn source(&self, name: &str) -> Option<&Source> {
        self.sources.get(name)
    }

    /// Source names in sorted order.
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }
}

/// A catalog file/folder name must be a single, non-trivial path component.
fn check_path_component(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} is empty"));
    }
    if value == "." || value == ".." {
        return Err(format!("{field} must not be {value:?}"));
    }
    if value.contains('/') || value.contains('\0') || value.contains('\n') {
        return Err(format!("{field} must be a single path component: {value:?}"));
    }
    Ok(())
}
