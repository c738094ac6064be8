//! State synchronization between the local cache and the remote catalog.
//!
//! The journal must stay fully usable with the backend down, so every flow
//! here is cache-first:
//!
//! - boot reads the cached snapshot synchronously and never waits on the
//!   network; a later [`AppStore::refresh`] reconciles with the backend and
//!   keeps silent on failure,
//! - every mutation attempts the remote call first and, if the backend is
//!   unavailable, commits a locally-synthesized result instead,
//! - both branches of every mutation re-persist the full snapshot.
//!
//! Reducer transitions are pure; all side effects (network, persistence)
//! happen in [`AppStore`] around the [`reduce`] calls.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{AppState, MovieDraft, MovieEntry, MovieId, MoviePatch, User};
use crate::remote::CatalogApi;
use crate::store::{StateCache, StateSnapshot};

/// Discrete state transitions.
#[derive(Debug, Clone)]
pub enum Action {
    /// Replace the collection (cache load, or a merged remote refresh).
    Init {
        user: Option<User>,
        movies: Vec<MovieEntry>,
    },
    /// Record an unexpected boot failure for the UI to render.
    SetError(String),
    /// Prepend a new entry (newest first).
    Add(MovieEntry),
    /// Replace the entry with the same id; unknown ids are a no-op.
    Update(MovieEntry),
    /// Remove the entry with this id.
    Delete(MovieId),
}

/// Pure reducer: current state plus an action produces the next state.
#[must_use]
pub fn reduce(state: &AppState, action: Action) -> AppState {
    match action {
        Action::Init { user, movies } => AppState {
            user,
            movies,
            loading: false,
            error: None,
        },
        Action::SetError(message) => AppState {
            loading: false,
            error: Some(message),
            ..state.clone()
        },
        Action::Add(entry) => {
            let mut next = state.clone();
            next.movies.insert(0, entry);
            next
        }
        Action::Update(entry) => {
            let mut next = state.clone();
            for movie in &mut next.movies {
                if movie.id == entry.id {
                    *movie = entry;
                    break;
                }
            }
            next
        }
        Action::Delete(id) => {
            let mut next = state.clone();
            next.movies.retain(|movie| movie.id != id);
            next
        }
    }
}

/// Merge two collections by id, remote winning on conflict.
///
/// Local entries are inserted first, then remote entries overwrite same-id
/// slots in place and remote-only entries append. The result keeps
/// first-seen insertion order, holds at most one entry per id, and never
/// drops a local-only entry that the server has no copy of.
#[must_use]
pub fn merge_by_id(local: &[MovieEntry], remote: &[MovieEntry]) -> Vec<MovieEntry> {
    let mut order: Vec<MovieId> = Vec::new();
    let mut by_id: HashMap<MovieId, MovieEntry> = HashMap::new();

    for entry in local.iter().chain(remote) {
        if by_id.insert(entry.id.clone(), entry.clone()).is_none() {
            order.push(entry.id.clone());
        }
    }

    order.into_iter().filter_map(|id| by_id.remove(&id)).collect()
}

/// Owner of the application state.
///
/// Composes the local cache and a [`CatalogApi`] client; the state is only
/// reachable through the read-only [`AppStore::state`] accessor and mutated
/// through the operations below.
pub struct AppStore<C> {
    state: AppState,
    cache: StateCache,
    client: C,
}

impl<C: CatalogApi> AppStore<C> {
    /// Boot from the local cache.
    ///
    /// Migrates legacy cache keys, reads the cached snapshot (absent or
    /// malformed reads as empty), and initializes state synchronously. The
    /// network is never consulted here, so the caller always gets a usable
    /// store in one tick; call [`AppStore::refresh`] afterwards to reconcile
    /// with the backend.
    ///
    /// A user id that cannot be resolved (empty after trimming) records an
    /// error in state instead of panicking or propagating.
    pub fn boot(cache: StateCache, client: C, user_id: &str) -> Self {
        cache.migrate_legacy_keys();
        let snapshot = cache.load_snapshot().unwrap_or_default();

        let mut store = Self {
            state: AppState::booting(),
            cache,
            client,
        };

        let user_id = user_id.trim();
        if user_id.is_empty() {
            store.apply(Action::Init {
                user: None,
                movies: snapshot.movies,
            });
            store.apply(Action::SetError("could not resolve a user id".to_string()));
        } else {
            store.apply(Action::Init {
                user: Some(User::new(user_id)),
                movies: snapshot.movies,
            });
        }
        store
    }

    /// Read-only snapshot of the current state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Attempt a remote refresh; returns whether the backend was reachable.
    ///
    /// On success the cached and remote collections are merged by id, state
    /// is re-initialized with the merged collection, and the snapshot is
    /// persisted. On failure state is left untouched: the cache-only
    /// snapshot stays authoritative for this session.
    pub async fn refresh(&mut self) -> bool {
        let Some(user) = self.state.user.clone() else {
            return false;
        };

        match self.client.list(&user.id).await {
            Ok(remote) => {
                let merged = merge_by_id(&self.state.movies, &remote);
                self.apply(Action::Init {
                    user: Some(user),
                    movies: merged,
                });
                self.persist();
                true
            }
            Err(error) => {
                tracing::warn!(%error, "Remote refresh failed; keeping cached state");
                false
            }
        }
    }

    /// Add a new entry.
    ///
    /// Remote create is attempted first; its echo (server-issued id,
    /// server-defaulted fields) is what gets committed. If the backend is
    /// unreachable the entry is committed with a `local-` id instead. A
    /// reachable backend rejecting the payload (4xx) surfaces as an error
    /// and commits nothing.
    pub async fn add(&mut self, draft: MovieDraft) -> Result<MovieEntry> {
        draft.validate()?;
        let user = self.require_user()?;

        match self.client.create(&user.id, &draft).await {
            Ok(entry) => {
                self.commit(Action::Add(entry.clone()));
                Ok(entry)
            }
            Err(error) if error.is_rejection() => Err(error.into()),
            Err(error) => {
                tracing::warn!(%error, "Remote create failed; keeping entry locally");
                let entry = draft.into_entry(MovieId::local(), &user.id);
                self.commit(Action::Add(entry.clone()));
                Ok(entry)
            }
        }
    }

    /// Update an existing entry.
    ///
    /// Unknown ids error immediately. Remote failure of any kind falls back
    /// to applying the patch locally (there is no server echo to prefer).
    pub async fn update(&mut self, id: &MovieId, patch: MoviePatch) -> Result<MovieEntry> {
        let existing = self
            .state
            .movies
            .iter()
            .find(|movie| &movie.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        match self.client.update(id, &patch).await {
            Ok(entry) => {
                self.commit(Action::Update(entry.clone()));
                Ok(entry)
            }
            Err(error) => {
                tracing::warn!(%error, "Remote update failed; applying patch locally");
                let entry = patch.apply(&existing);
                self.commit(Action::Update(entry.clone()));
                Ok(entry)
            }
        }
    }

    /// Delete an entry.
    ///
    /// The entry leaves in-memory state and the persisted snapshot whether
    /// or not the remote delete succeeded.
    pub async fn delete(&mut self, id: &MovieId) -> Result<()> {
        if !self.state.movies.iter().any(|movie| &movie.id == id) {
            return Err(Error::NotFound(id.to_string()));
        }

        if let Err(error) = self.client.remove(id).await {
            tracing::warn!(%error, "Remote delete failed; removing locally");
        }
        self.commit(Action::Delete(id.clone()));
        Ok(())
    }

    fn require_user(&self) -> Result<User> {
        self.state
            .user
            .clone()
            .ok_or_else(|| Error::InvalidInput("no user resolved".to_string()))
    }

    fn apply(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    /// Apply an action and persist the resulting snapshot.
    fn commit(&mut self, action: Action) {
        self.apply(action);
        self.persist();
    }

    fn persist(&self) {
        self.cache.save_snapshot(&StateSnapshot::from(&self.state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RemoteError, RemoteResult};
    use pretty_assertions::assert_eq;

    fn entry(id: &str, title: &str) -> MovieEntry {
        MovieEntry {
            id: id.into(),
            user_id: "u1".into(),
            date: "2024-01-01".into(),
            title: title.into(),
            comment: String::new(),
            poster: String::new(),
            tmdb_id: None,
            genres: vec![],
        }
    }

    fn unavailable() -> RemoteError {
        RemoteError::Status {
            status: 503,
            message: "service unavailable".into(),
        }
    }

    /// Backend that never answers successfully.
    struct OfflineClient;

    impl CatalogApi for OfflineClient {
        async fn list(&self, _user_id: &str) -> RemoteResult<Vec<MovieEntry>> {
            Err(unavailable())
        }
        async fn create(&self, _user_id: &str, _draft: &MovieDraft) -> RemoteResult<MovieEntry> {
            Err(unavailable())
        }
        async fn update(&self, _id: &MovieId, _patch: &MoviePatch) -> RemoteResult<MovieEntry> {
            Err(unavailable())
        }
        async fn remove(&self, _id: &MovieId) -> RemoteResult<()> {
            Err(unavailable())
        }
    }

    /// Healthy backend holding a fixed remote collection.
    struct ServerClient {
        remote: Vec<MovieEntry>,
    }

    impl CatalogApi for ServerClient {
        async fn list(&self, _user_id: &str) -> RemoteResult<Vec<MovieEntry>> {
            Ok(self.remote.clone())
        }
        async fn create(&self, user_id: &str, draft: &MovieDraft) -> RemoteResult<MovieEntry> {
            Ok(draft.clone().into_entry(MovieId::issued(), user_id))
        }
        async fn update(&self, id: &MovieId, patch: &MoviePatch) -> RemoteResult<MovieEntry> {
            let existing = self
                .remote
                .iter()
                .find(|movie| &movie.id == id)
                .ok_or(RemoteError::Status {
                    status: 404,
                    message: "not found".into(),
                })?;
            Ok(patch.apply(existing))
        }
        async fn remove(&self, _id: &MovieId) -> RemoteResult<()> {
            Ok(())
        }
    }

    /// Reachable backend that rejects every create as invalid.
    struct RejectingClient;

    impl CatalogApi for RejectingClient {
        async fn list(&self, _user_id: &str) -> RemoteResult<Vec<MovieEntry>> {
            Ok(vec![])
        }
        async fn create(&self, _user_id: &str, _draft: &MovieDraft) -> RemoteResult<MovieEntry> {
            Err(RemoteError::Status {
                status: 400,
                message: "userId, date, title required".into(),
            })
        }
        async fn update(&self, _id: &MovieId, _patch: &MoviePatch) -> RemoteResult<MovieEntry> {
            Err(unavailable())
        }
        async fn remove(&self, _id: &MovieId) -> RemoteResult<()> {
            Err(unavailable())
        }
    }

    fn seeded_cache(movies: Vec<MovieEntry>) -> (tempfile::TempDir, StateCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = StateCache::new(dir.path());
        cache.save_snapshot(&StateSnapshot {
            user: None,
            movies,
        });
        (dir, cache)
    }

    fn draft(title: &str) -> MovieDraft {
        MovieDraft {
            date: "2024-01-01".into(),
            title: title.into(),
            ..Default::default()
        }
    }

    // --- merge ---

    #[test]
    fn merge_with_itself_is_idempotent() {
        let movies = vec![entry("a", "A"), entry("b", "B")];
        let merged = merge_by_id(&movies, &movies);
        assert_eq!(merged, movies);
    }

    #[test]
    fn merge_of_disjoint_ids_is_a_union() {
        let local = vec![entry("a", "A")];
        let remote = vec![entry("b", "B")];
        let merged = merge_by_id(&local, &remote);
        assert_eq!(merged, vec![entry("a", "A"), entry("b", "B")]);
    }

    #[test]
    fn merge_remote_wins_on_conflict() {
        let local = vec![entry("x", "old")];
        let remote = vec![entry("x", "new")];
        let merged = merge_by_id(&local, &remote);
        assert_eq!(merged, vec![entry("x", "new")]);
    }

    #[test]
    fn merge_preserves_local_only_entries() {
        let local = vec![entry("local-1", "Offline add"), entry("x", "old")];
        let remote = vec![entry("x", "new"), entry("y", "Y")];
        let merged = merge_by_id(&local, &remote);
        assert_eq!(
            merged,
            vec![entry("local-1", "Offline add"), entry("x", "new"), entry("y", "Y")]
        );
    }

    #[test]
    fn merge_keeps_first_seen_order() {
        let local = vec![entry("a", "A"), entry("b", "B")];
        let remote = vec![entry("c", "C"), entry("b", "B2")];
        let merged = merge_by_id(&local, &remote);
        let ids: Vec<&str> = merged.iter().map(|movie| movie.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    // --- reducer ---

    #[test]
    fn reduce_add_prepends() {
        let state = reduce(
            &AppState::booting(),
            Action::Init {
                user: Some(User::new("u1")),
                movies: vec![entry("a", "A")],
            },
        );
        let state = reduce(&state, Action::Add(entry("b", "B")));
        assert_eq!(state.movies[0].id.as_str(), "b");
        assert_eq!(state.movies.len(), 2);
    }

    #[test]
    fn reduce_update_unknown_id_is_noop() {
        let state = reduce(
            &AppState::booting(),
            Action::Init {
                user: None,
                movies: vec![entry("a", "A")],
            },
        );
        let next = reduce(&state, Action::Update(entry("zzz", "Z")));
        assert_eq!(next.movies, state.movies);
    }

    #[test]
    fn reduce_is_pure() {
        let state = reduce(
            &AppState::booting(),
            Action::Init {
                user: None,
                movies: vec![entry("a", "A")],
            },
        );
        let before = state.clone();
        let _ = reduce(&state, Action::Delete("a".into()));
        assert_eq!(state, before);
    }

    // --- boot ---

    #[test]
    fn boot_uses_cache_without_touching_network() {
        let (_dir, cache) = seeded_cache(vec![entry("a", "A"), entry("b", "B")]);

        // Purely synchronous: no runtime is even running here.
        let store = AppStore::boot(cache, OfflineClient, "u1");

        assert!(!store.state().loading);
        assert_eq!(store.state().movies.len(), 2);
        assert_eq!(store.state().user, Some(User::new("u1")));
    }

    #[test]
    fn boot_with_empty_cache_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = AppStore::boot(StateCache::new(dir.path()), OfflineClient, "u1");
        assert!(store.state().movies.is_empty());
        assert!(!store.state().loading);
    }

    #[test]
    fn boot_with_unresolvable_user_sets_error() {
        let (_dir, cache) = seeded_cache(vec![entry("a", "A")]);
        let store = AppStore::boot(cache, OfflineClient, "   ");
        assert!(!store.state().loading);
        assert!(store.state().error.is_some());
        // Cached entries are still shown.
        assert_eq!(store.state().movies.len(), 1);
    }

    // --- refresh ---

    #[tokio::test]
    async fn refresh_merges_and_persists() {
        let (_dir, cache) = seeded_cache(vec![entry("local-1", "Offline"), entry("x", "old")]);
        let mut store = AppStore::boot(
            cache.clone(),
            ServerClient {
                remote: vec![entry("x", "new")],
            },
            "u1",
        );

        assert!(store.refresh().await);

        let titles: Vec<&str> = store
            .state()
            .movies
            .iter()
            .map(|movie| movie.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Offline", "new"]);

        let persisted = cache.load_snapshot().unwrap();
        assert_eq!(persisted.movies, store.state().movies);
    }

    #[tokio::test]
    async fn refresh_failure_keeps_cached_state() {
        let (_dir, cache) = seeded_cache(vec![entry("a", "A")]);
        let mut store = AppStore::boot(cache, OfflineClient, "u1");
        let before = store.state().clone();

        assert!(!store.refresh().await);
        assert_eq!(store.state(), &before);
    }

    // --- add ---

    #[tokio::test]
    async fn add_commits_server_echo_on_success() {
        let (_dir, cache) = seeded_cache(vec![]);
        let mut store = AppStore::boot(cache.clone(), ServerClient { remote: vec![] }, "u1");

        let added = store.add(draft("X")).await.unwrap();

        assert!(!added.id.is_local());
        assert_eq!(store.state().movies.len(), 1);
        assert_eq!(cache.load_snapshot().unwrap().movies.len(), 1);
    }

    #[tokio::test]
    async fn add_falls_back_to_local_id_when_unreachable() {
        let (_dir, cache) = seeded_cache(vec![]);
        let mut store = AppStore::boot(cache.clone(), OfflineClient, "u1");

        let added = store.add(draft("X")).await.unwrap();

        assert!(added.id.is_local());
        assert_eq!(store.state().movies.len(), 1);

        let persisted = cache.load_snapshot().unwrap();
        assert_eq!(persisted.movies.len(), 1);
        assert!(persisted.movies[0].id.is_local());
    }

    #[tokio::test]
    async fn add_surfaces_server_rejection_without_local_record() {
        let (_dir, cache) = seeded_cache(vec![]);
        let mut store = AppStore::boot(cache.clone(), RejectingClient, "u1");

        let result = store.add(draft("X")).await;

        assert!(matches!(result, Err(Error::Remote(_))));
        assert!(store.state().movies.is_empty());
        assert!(cache.load_snapshot().unwrap().movies.is_empty());
    }

    #[tokio::test]
    async fn add_rejects_invalid_draft_before_any_network_call() {
        let (_dir, cache) = seeded_cache(vec![]);
        let mut store = AppStore::boot(cache, ServerClient { remote: vec![] }, "u1");

        let result = store.add(draft("   ")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(store.state().movies.is_empty());
    }

    // --- update ---

    #[tokio::test]
    async fn update_applies_patch_locally_when_unreachable() {
        let (_dir, cache) = seeded_cache(vec![entry("m1", "Old title")]);
        let mut store = AppStore::boot(cache.clone(), OfflineClient, "u1");

        let patch = MoviePatch {
            title: Some("New title".into()),
            ..Default::default()
        };
        let updated = store.update(&"m1".into(), patch).await.unwrap();

        assert_eq!(updated.title, "New title");
        assert_eq!(store.state().movies[0].title, "New title");
        assert_eq!(cache.load_snapshot().unwrap().movies[0].title, "New title");
    }

    #[tokio::test]
    async fn update_unknown_id_errors() {
        let (_dir, cache) = seeded_cache(vec![]);
        let mut store = AppStore::boot(cache, OfflineClient, "u1");

        let result = store.update(&"missing".into(), MoviePatch::default()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    // --- delete ---

    #[tokio::test]
    async fn delete_removes_locally_even_when_remote_fails() {
        let (_dir, cache) = seeded_cache(vec![entry("m1", "A"), entry("m2", "B")]);
        let mut store = AppStore::boot(cache.clone(), OfflineClient, "u1");

        store.delete(&"m1".into()).await.unwrap();

        assert_eq!(store.state().movies.len(), 1);
        assert_eq!(store.state().movies[0].id.as_str(), "m2");

        let persisted = cache.load_snapshot().unwrap();
        assert_eq!(persisted.movies.len(), 1);
        assert_eq!(persisted.movies[0].id.as_str(), "m2");
    }

    #[tokio::test]
    async fn delete_unknown_id_errors() {
        let (_dir, cache) = seeded_cache(vec![]);
        let mut store = AppStore::boot(cache, OfflineClient, "u1");

        let result = store.delete(&"missing".into()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
