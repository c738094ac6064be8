//! File-backed local cache.
//!
//! Plays the role the browser's `localStorage` played for the journal: a
//! small key-value area of serialized JSON, addressed by string keys, that
//! keeps the last known state available across sessions and while the
//! backend is unreachable. Every failure mode is soft: a malformed payload
//! reads as absent, and a failed write degrades durability without touching
//! in-memory state.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{AppState, MovieEntry, MovieId, User};

/// Current versioned cache key.
pub const STATE_KEY: &str = "reel_journal_v2";

/// Superseded keys from earlier schema versions, newest first. Consulted
/// (read-then-clear) only when the current key has no value.
pub const LEGACY_STATE_KEYS: &[&str] = &["movie_journal_v1", "my_movie_timeline"];

/// The persisted shape of the application state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub movies: Vec<MovieEntry>,
}

impl From<&AppState> for StateSnapshot {
    fn from(state: &AppState) -> Self {
        Self {
            user: state.user.clone(),
            movies: state.movies.clone(),
        }
    }
}

/// Key-value cache rooted at a directory, one JSON file per key.
#[derive(Debug, Clone)]
pub struct StateCache {
    dir: PathBuf,
}

impl StateCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and deserialize the value stored under `key`.
    ///
    /// Missing, unreadable, and malformed payloads all read as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.load_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(key, %error, "Discarding malformed cache payload");
                None
            }
        }
    }

    /// Serialize and store `value` under `key`.
    ///
    /// Write failures (missing permissions, full disk) are logged and
    /// swallowed; only durability is degraded.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(raw) => self.save_raw(key, &raw),
            Err(error) => {
                tracing::warn!(key, %error, "Failed to serialize cache payload");
            }
        }
    }

    /// Remove the value stored under `key`. Missing values are a no-op.
    pub fn clear(&self, key: &str) {
        let path = self.key_path(key);
        if let Err(error) = fs::remove_file(&path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(key, %error, "Failed to clear cache key");
            }
        }
    }

    /// Copy the first populated legacy key to the current key, then clear it.
    ///
    /// Runs at most once per boot and is idempotent: once the current key
    /// holds a value, every subsequent call is a no-op.
    pub fn migrate_legacy_keys(&self) {
        if self.load_raw(STATE_KEY).is_some() {
            return;
        }
        for legacy in LEGACY_STATE_KEYS {
            if let Some(raw) = self.load_raw(legacy) {
                tracing::info!(from = legacy, to = STATE_KEY, "Migrating legacy cache key");
                self.save_raw(STATE_KEY, &raw);
                self.clear(legacy);
                return;
            }
        }
    }

    /// Load the cached state snapshot, normalizing older payload shapes.
    pub fn load_snapshot(&self) -> Option<StateSnapshot> {
        self.load::<RawSnapshot>(STATE_KEY).map(RawSnapshot::normalize)
    }

    /// Persist the full state snapshot under the current key.
    pub fn save_snapshot(&self, snapshot: &StateSnapshot) {
        self.save(STATE_KEY, snapshot);
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn load_raw(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(raw) => Some(raw),
            Err(error) => {
                if error.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(key, %error, "Failed to read cache key");
                }
                None
            }
        }
    }

    fn save_raw(&self, key: &str, raw: &str) {
        if let Err(error) = fs::create_dir_all(&self.dir) {
            tracing::warn!(key, %error, "Failed to create cache directory");
            return;
        }
        if let Err(error) = fs::write(self.key_path(key), raw) {
            tracing::warn!(key, %error, "Failed to write cache key");
        }
    }
}

/// Loose cache payload: either the current `{user, movies}` object or the
/// bare entry array an earlier schema wrote.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSnapshot {
    State {
        #[serde(default)]
        user: Option<User>,
        #[serde(default)]
        movies: Vec<RawEntry>,
    },
    Bare(Vec<RawEntry>),
}

/// A cached entry whose id may be missing (pre-backend records). Id-less
/// entries are assigned a fresh local id on load so the merge layer only
/// ever sees addressable entries.
#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: Option<MovieId>,
    #[serde(rename = "userId", default)]
    user_id: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    poster: String,
    #[serde(rename = "tmdbId", default)]
    tmdb_id: Option<i64>,
    #[serde(default)]
    genres: Vec<String>,
}

impl RawSnapshot {
    fn normalize(self) -> StateSnapshot {
        let (user, movies) = match self {
            Self::State { user, movies } => (user, movies),
            Self::Bare(movies) => (None, movies),
        };
        StateSnapshot {
            user,
            movies: movies.into_iter().map(RawEntry::normalize).collect(),
        }
    }
}

impl RawEntry {
    fn normalize(self) -> MovieEntry {
        MovieEntry {
            id: self.id.unwrap_or_else(MovieId::local),
            user_id: self.user_id,
            date: self.date,
            title: self.title,
            comment: self.comment,
            poster: self.poster,
            tmdb_id: self.tmdb_id,
            genres: self.genres,
        }
    }
}
