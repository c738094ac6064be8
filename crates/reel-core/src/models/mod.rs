//! Data models for Reel

mod movie;
mod state;

pub use movie::{MovieDraft, MovieEntry, MovieId, MoviePatch};
pub use state::{AppState, User};
