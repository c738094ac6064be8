//! Error types for reel-core

use thiserror::Error;

use crate::remote::RemoteError;

/// Result type alias using reel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in reel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Remote catalog API error
    #[error("Remote API error: {0}")]
    Remote(#[from] RemoteError),

    /// Movie not found
    #[error("Movie not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
