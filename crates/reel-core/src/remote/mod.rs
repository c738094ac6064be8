//! HTTP client for the backend movie catalog.
//!
//! Thin wrapper over the backend's four REST endpoints. No retries and no
//! internal fallback live here; the synchronization layer decides what a
//! failed call means.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{MovieDraft, MovieEntry, MovieId, MoviePatch};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Errors from the remote catalog.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Invalid catalog configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Catalog HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message} ({status})")]
    Status { status: u16, message: String },
}

impl RemoteError {
    /// Whether the server was reachable and rejected the request (4xx).
    ///
    /// Rejections mean the input must change; availability failures
    /// (transport errors, 5xx) mean the caller may fall back to local-only
    /// operation.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status >= 400 && *status < 500)
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations the backend catalog exposes, all scoped by owner.
///
/// `AppStore` is generic over this trait so tests can substitute failing or
/// recording doubles for the HTTP client.
pub trait CatalogApi {
    /// Fetch all entries owned by `user_id`, newest first.
    fn list(
        &self,
        user_id: &str,
    ) -> impl std::future::Future<Output = RemoteResult<Vec<MovieEntry>>> + Send;

    /// Create an entry; the server assigns the id and may default absent
    /// optional fields, so callers must use the returned entry.
    fn create(
        &self,
        user_id: &str,
        draft: &MovieDraft,
    ) -> impl std::future::Future<Output = RemoteResult<MovieEntry>> + Send;

    /// Apply a partial update to an existing entry.
    fn update(
        &self,
        id: &MovieId,
        patch: &MoviePatch,
    ) -> impl std::future::Future<Output = RemoteResult<MovieEntry>> + Send;

    /// Delete an entry.
    fn remove(&self, id: &MovieId) -> impl std::future::Future<Output = RemoteResult<()>> + Send;
}

/// reqwest-backed [`CatalogApi`] implementation.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().build()?,
        })
    }

    fn movies_url(&self) -> String {
        format!("{}/api/movies", self.base_url)
    }

    fn movie_url(&self, id: &MovieId) -> String {
        format!("{}/api/movies/{}", self.base_url, id)
    }
}

impl CatalogApi for HttpCatalogClient {
    async fn list(&self, user_id: &str) -> RemoteResult<Vec<MovieEntry>> {
        let response = self
            .client
            .get(self.movies_url())
            .query(&[("userId", user_id)])
            .send()
            .await?;
        let payload: ListResponse = decode(response).await?;
        Ok(payload.movies)
    }

    async fn create(&self, user_id: &str, draft: &MovieDraft) -> RemoteResult<MovieEntry> {
        let body = CreateBody { user_id, draft };
        let response = self
            .client
            .post(self.movies_url())
            .json(&body)
            .send()
            .await?;
        let payload: MovieResponse = decode(response).await?;
        Ok(payload.movie)
    }

    async fn update(&self, id: &MovieId, patch: &MoviePatch) -> RemoteResult<MovieEntry> {
        let response = self
            .client
            .put(self.movie_url(id))
            .json(patch)
            .send()
            .await?;
        let payload: MovieResponse = decode(response).await?;
        Ok(payload.movie)
    }

    async fn remove(&self, id: &MovieId) -> RemoteResult<()> {
        let response = self.client.delete(self.movie_url(id)).send().await?;
        decode::<AckResponse>(response).await?;
        Ok(())
    }
}

#[derive(Debug, serde::Serialize)]
struct CreateBody<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    #[serde(flatten)]
    draft: &'a MovieDraft,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    movies: Vec<MovieEntry>,
}

#[derive(Debug, Deserialize)]
struct MovieResponse {
    movie: MovieEntry,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    #[allow(dead_code)]
    #[serde(default)]
    ok: bool,
}

async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> RemoteResult<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        });
    }
    Ok(response.json::<T>().await?)
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.error.or(payload.message) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        compact_text(trimmed)
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
