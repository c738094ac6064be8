//! External film-catalog lookup (TMDB-style).
//!
//! Fully decoupled from the persistence core: every failure mode — missing
//! API key, unreachable catalog, unexpected payload — degrades to "no
//! suggestions" instead of an error.

use serde::Deserialize;

use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w342";
const MAX_SUGGESTIONS: usize = 8;

/// One candidate match for a free-text title query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub tmdb_id: i64,
    pub title: String,
    pub poster: Option<String>,
}

/// Film-catalog search client.
#[derive(Debug, Clone)]
pub struct LookupClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl LookupClient {
    /// Build a client; `api_key: None` disables lookups entirely.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = normalize_text_option(Some(base_url.into()))
            .filter(|url| is_http_url(url))
            .map_or_else(|| DEFAULT_BASE_URL.to_string(), |url| {
                url.trim_end_matches('/').to_string()
            });
        Self {
            base_url,
            api_key: normalize_text_option(api_key),
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from `REEL_TMDB_BASE` / `REEL_TMDB_KEY`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("REEL_TMDB_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            std::env::var("REEL_TMDB_KEY").ok(),
        )
    }

    /// Whether an API key is configured.
    pub const fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Search the catalog; returns at most [`MAX_SUGGESTIONS`] candidates.
    pub async fn search(&self, query: &str) -> Vec<Suggestion> {
        let Some(api_key) = &self.api_key else {
            return Vec::new();
        };
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let request = self
            .client
            .get(format!("{}/search/movie", self.base_url))
            .query(&[("api_key", api_key.as_str()), ("query", query)]);

        match fetch::<SearchResponse>(request).await {
            Some(payload) => payload
                .results
                .into_iter()
                .filter_map(SearchResult::into_suggestion)
                .take(MAX_SUGGESTIONS)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Fetch the genre names for a catalog entry.
    pub async fn genres(&self, tmdb_id: i64) -> Vec<String> {
        let Some(api_key) = &self.api_key else {
            return Vec::new();
        };

        let request = self
            .client
            .get(format!("{}/movie/{tmdb_id}", self.base_url))
            .query(&[("api_key", api_key.as_str())]);

        match fetch::<DetailResponse>(request).await {
            Some(payload) => payload.genres.into_iter().map(|genre| genre.name).collect(),
            None => Vec::new(),
        }
    }
}

/// Issue a request and decode the body, logging and swallowing any failure.
async fn fetch<T: serde::de::DeserializeOwned>(request: reqwest::RequestBuilder) -> Option<T> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(%error, "Catalog lookup request failed");
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), "Catalog lookup returned an error status");
        return None;
    }
    match response.json::<T>().await {
        Ok(payload) => Some(payload),
        Err(error) => {
            tracing::warn!(%error, "Catalog lookup payload could not be decoded");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: Option<i64>,
    title: Option<String>,
    poster_path: Option<String>,
}

impl SearchResult {
    fn into_suggestion(self) -> Option<Suggestion> {
        Some(Suggestion {
            tmdb_id: self.id?,
            title: normalize_text_option(self.title)?,
            poster: self
                .poster_path
                .map(|path| format!("{POSTER_BASE_URL}{path}")),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}
