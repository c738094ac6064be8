//! Flat-file movie store.
//!
//! Every operation is a full read-modify-write of one JSON file. A missing
//! file reads as an empty collection and is created on first write; a
//! malformed file also reads as empty rather than failing the request.
//! Concurrent access is serialized by the caller (see `routes::AppState`).

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use reel_core::models::{MovieEntry, MovieId};

use crate::error::ApiError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct DbFile {
    #[serde(default)]
    movies: Vec<MovieEntry>,
}

#[derive(Debug)]
pub struct JsonDb {
    path: PathBuf,
}

impl JsonDb {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All entries, optionally filtered by owner. Absent owner lists all.
    pub fn list(&self, user_id: Option<&str>) -> Vec<MovieEntry> {
        let movies = self.load().movies;
        match user_id {
            Some(user_id) => movies
                .into_iter()
                .filter(|movie| movie.user_id == user_id)
                .collect(),
            None => movies,
        }
    }

    /// Prepend a new entry (newest first) and persist.
    pub fn insert(&self, entry: MovieEntry) -> Result<MovieEntry, ApiError> {
        let mut data = self.load();
        data.movies.insert(0, entry.clone());
        self.save(&data)?;
        Ok(entry)
    }

    /// Merge `body` fields over the stored entry; the path id always wins.
    ///
    /// Returns `Ok(None)` when the id is unknown.
    pub fn update(
        &self,
        id: &MovieId,
        body: &serde_json::Value,
    ) -> Result<Option<MovieEntry>, ApiError> {
        let patch = body
            .as_object()
            .ok_or_else(|| ApiError::bad_request("request body must be a JSON object"))?;

        let mut data = self.load();
        let Some(slot) = data.movies.iter_mut().find(|movie| &movie.id == id) else {
            return Ok(None);
        };

        let mut merged = serde_json::to_value(&*slot)?;
        let target = merged
            .as_object_mut()
            .ok_or_else(|| ApiError::Internal("stored entry is not an object".to_string()))?;
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
        target.insert("id".to_string(), serde_json::Value::String(id.to_string()));

        let updated: MovieEntry = serde_json::from_value(merged)
            .map_err(|error| ApiError::bad_request(format!("invalid entry fields: {error}")))?;
        *slot = updated.clone();

        self.save(&data)?;
        Ok(Some(updated))
    }

    /// Remove an entry; returns whether anything was removed.
    pub fn remove(&self, id: &MovieId) -> Result<bool, ApiError> {
        let mut data = self.load();
        let before = data.movies.len();
        data.movies.retain(|movie| &movie.id != id);
        let removed = data.movies.len() != before;
        if removed {
            self.save(&data)?;
        }
        Ok(removed)
    }

    fn load(&self) -> DbFile {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(%error, path = %self.path.display(), "Failed to read db file");
                }
                return DbFile::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(error) => {
                tracing::warn!(%error, path = %self.path.display(), "Malformed db file, treating as empty");
                DbFile::default()
            }
        }
    }

    fn save(&self, data: &DbFile) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(data)?)?;
        Ok(())
    }
}
