use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use reel_core::models::{MovieEntry, MovieId};

use crate::db::JsonDb;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    // The Mutex serializes the db's read-modify-write cycles.
    db: Arc<Mutex<JsonDb>>,
}

impl AppState {
    pub fn new(db: JsonDb) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/movies", get(list_movies).post(create_movie))
        .route("/api/movies/{id}", put(update_movie).delete(delete_movie))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListResponse {
    ok: bool,
    movies: Vec<MovieEntry>,
}

async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let db = state.db.lock().await;
    let movies = db.list(query.user_id.as_deref());
    Ok(Json(ListResponse { ok: true, movies }))
}

/// Create payload, field by field as the client sends them. `genres` is
/// accepted as any JSON value; anything that is not an array of strings
/// collapses to an empty list.
#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(rename = "userId", default)]
    user_id: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    poster: Option<String>,
    #[serde(rename = "tmdbId", default)]
    tmdb_id: Option<i64>,
    #[serde(default)]
    genres: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct MovieResponse {
    ok: bool,
    movie: MovieEntry,
}

#[derive(Debug, Serialize)]
struct AckResponse {
    ok: bool,
}

async fn create_movie(
    State(state): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<(StatusCode, Json<MovieResponse>), ApiError> {
    let required = |value: Option<String>| value.filter(|value| !value.trim().is_empty());

    let (Some(user_id), Some(date), Some(title)) = (
        required(request.user_id),
        required(request.date),
        required(request.title),
    ) else {
        return Err(ApiError::bad_request("userId, date, title required"));
    };

    let genres = match request.genres {
        Some(serde_json::Value::Array(values)) => values
            .into_iter()
            .filter_map(|value| value.as_str().map(ToString::to_string))
            .collect(),
        _ => Vec::new(),
    };

    let movie = MovieEntry {
        id: MovieId::issued(),
        user_id,
        date,
        title,
        comment: request.comment.unwrap_or_default(),
        poster: request.poster.unwrap_or_default(),
        tmdb_id: request.tmdb_id,
        genres,
    };

    let db = state.db.lock().await;
    let movie = db.insert(movie)?;
    tracing::info!(id = %movie.id, user = %movie.user_id, "Created movie entry");
    Ok((StatusCode::CREATED, Json(MovieResponse { ok: true, movie })))
}

async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<MovieResponse>, ApiError> {
    let id = MovieId::from(id);
    let db = state.db.lock().await;
    match db.update(&id, &body)? {
        Some(movie) => {
            tracing::info!(%id, "Updated movie entry");
            Ok(Json(MovieResponse { ok: true, movie }))
        }
        None => Err(ApiError::NotFound),
    }
}

async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, ApiError> {
    let id = MovieId::from(id);
    let db = state.db.lock().await;
    if db.remove(&id)? {
        tracing::info!(%id, "Deleted movie entry");
        Ok(Json(AckResponse { ok: true }))
    } else {
        Err(ApiError::NotFound)
    }
}
