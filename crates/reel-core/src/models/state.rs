//! Application state owned by the synchronization layer.

use serde::{Deserialize, Serialize};

use super::MovieEntry;

/// The signed-in (or development) user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Full application state.
///
/// Owned exclusively by [`crate::sync::AppStore`]; everything else reads
/// snapshots and goes through the store's operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub user: Option<User>,
    pub movies: Vec<MovieEntry>,
    #[serde(skip)]
    pub loading: bool,
    #[serde(skip)]
    pub error: Option<String>,
}

impl AppState {
    /// Initial state before the cache has been read.
    #[must_use]
    pub fn booting() -> Self {
        Self {
            user: None,
            movies: Vec::new(),
            loading: true,
            error: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::booting()
    }
}
