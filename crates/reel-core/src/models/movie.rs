//! Movie journal entry model

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for a journal entry.
///
/// Server-issued ids are bare UUIDs. Ids synthesized on the client while the
/// backend is unreachable carry the `local-` prefix, so the two formats can
/// never collide and a later sync can tell the provenance apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(String);

impl MovieId {
    /// Prefix reserved for ids minted on the client.
    pub const LOCAL_PREFIX: &'static str = "local-";

    /// Mint a server-style id (bare UUID v7, time-sortable).
    #[must_use]
    pub fn issued() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Mint a client-local fallback id.
    #[must_use]
    pub fn local() -> Self {
        Self(format!("{}{}", Self::LOCAL_PREFIX, Uuid::now_v7()))
    }

    /// Whether this id was minted on the client rather than the server.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(Self::LOCAL_PREFIX)
    }

    /// Get the string representation of this id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MovieId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MovieId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One movie-watching record in the journal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieEntry {
    /// Unique identifier (unique within a user's collection)
    pub id: MovieId,
    /// Owner scope
    #[serde(rename = "userId", default)]
    pub user_id: String,
    /// Calendar date the movie was watched (user-supplied, ISO-like)
    pub date: String,
    /// Movie title
    pub title: String,
    /// Free-form review comment
    #[serde(default)]
    pub comment: String,
    /// Poster image URL
    #[serde(default)]
    pub poster: String,
    /// External film-catalog identifier, when the entry came from a lookup
    #[serde(rename = "tmdbId", default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
    /// Genre names, ordered as the catalog returned them
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Creation payload: a [`MovieEntry`] before an id has been assigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDraft {
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub poster: String,
    #[serde(rename = "tmdbId", default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl MovieDraft {
    /// Check the required fields (`date`, `title`) are present and non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.date.trim().is_empty() {
            return Err(Error::InvalidInput("date is required".into()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput("title is required".into()));
        }
        Ok(())
    }

    /// Materialize this draft as an entry with the given id and owner.
    #[must_use]
    pub fn into_entry(self, id: MovieId, user_id: impl Into<String>) -> MovieEntry {
        MovieEntry {
            id,
            user_id: user_id.into(),
            date: self.date,
            title: self.title,
            comment: self.comment,
            poster: self.poster,
            tmdb_id: self.tmdb_id,
            genres: self.genres,
        }
    }
}

/// Partial update: every field optional, absent fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoviePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(rename = "tmdbId", skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
}

impl MoviePatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply this patch on top of an existing entry, preserving its id.
    #[must_use]
    pub fn apply(&self, existing: &MovieEntry) -> MovieEntry {
        let mut entry = existing.clone();
        if let Some(date) = &self.date {
            entry.date.clone_from(date);
        }
        if let Some(title) = &self.title {
            entry.title.clone_from(title);
        }
        if let Some(comment) = &self.comment {
            entry.comment.clone_from(comment);
        }
        if let Some(poster) = &self.poster {
            entry.poster.clone_from(poster);
        }
        if let Some(tmdb_id) = self.tmdb_id {
            entry.tmdb_id = Some(tmdb_id);
        }
        if let Some(genres) = &self.genres {
            entry.genres.clone_from(genres);
        }
        entry
    }
}
