//! reel-core - Core library for Reel
//!
//! This crate contains the shared models, the file-backed local cache, the
//! remote catalog client, and the synchronization layer used by all Reel
//! front ends.

pub mod error;
pub mod lookup;
pub mod models;
pub mod remote;
pub mod store;
pub mod sync;
mod util;

pub use error::{Error, Result};
pub use models::{AppState, MovieDraft, MovieEntry, MovieId, MoviePatch, User};
pub use remote::{CatalogApi, HttpCatalogClient, RemoteError};
pub use store::StateCache;
pub use sync::AppStore;
