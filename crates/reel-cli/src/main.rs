//! Reel CLI - a personal movie journal from the terminal.
//!
//! Every command boots from the local cache first and then tries to
//! reconcile with the backend, so the journal stays fully usable with the
//! backend down.

use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use reel_core::lookup::LookupClient;
use reel_core::{
    AppStore, HttpCatalogClient, MovieDraft, MovieEntry, MovieId, MoviePatch, StateCache,
};
use thiserror::Error;

const DEFAULT_API_BASE: &str = "http://localhost:4000";
const DEFAULT_USER_ID: &str = "dev-user-1";

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Record and browse your movie journal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional override for the cache directory
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Backend base URL (default: $REEL_API_BASE or http://localhost:4000)
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,

    /// User id to scope the journal to (default: $REEL_USER_ID or dev-user-1)
    #[arg(long, value_name = "ID")]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a watched movie
    #[command(alias = "new")]
    Add {
        /// Date watched (e.g. 2024-01-31)
        date: String,
        /// Movie title
        title: String,
        /// Review comment
        #[arg(short, long, default_value = "")]
        comment: String,
        /// Poster image URL
        #[arg(long)]
        poster: Option<String>,
        /// Fill poster/genres from the film catalog before saving
        #[arg(long)]
        lookup: bool,
    },
    /// List journal entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Sort order
        #[arg(long, value_enum, default_value_t = SortKey::Date)]
        sort: SortKey,
        /// Only show entries with this genre
        #[arg(long)]
        genre: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search entries by title or comment
    Search {
        /// Search query
        query: String,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing entry
    Edit {
        /// Entry id
        id: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        comment: Option<String>,
        #[arg(long)]
        poster: Option<String>,
    },
    /// Delete an entry
    Delete {
        /// Entry id
        id: String,
    },
    /// Search the film catalog for title suggestions
    Lookup {
        /// Free-text title query
        query: String,
    },
    /// Force a reconciliation with the backend
    Sync,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum SortKey {
    /// Newest watch date first
    Date,
    /// Alphabetical by title
    Title,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] reel_core::Error),
    #[error(transparent)]
    Remote(#[from] reel_core::RemoteError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Nothing to update: pass at least one of --date/--title/--comment/--poster")]
    EmptyPatch,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reel=warn".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let mut store = boot_store(&cli)?;

    match cli.command {
        Commands::Add {
            date,
            title,
            comment,
            poster,
            lookup,
        } => run_add(&mut store, date, title, comment, poster, lookup).await?,
        Commands::List {
            limit,
            sort,
            genre,
            json,
        } => run_list(&mut store, limit, sort, genre.as_deref(), json).await?,
        Commands::Search { query, limit, json } => {
            run_search(&mut store, &query, limit, json).await?;
        }
        Commands::Edit {
            id,
            date,
            title,
            comment,
            poster,
        } => run_edit(&mut store, &id, date, title, comment, poster).await?,
        Commands::Delete { id } => run_delete(&mut store, &id).await?,
        Commands::Lookup { query } => run_lookup(&query).await?,
        Commands::Sync => run_sync(&mut store).await?,
    }

    Ok(())
}

fn boot_store(cli: &Cli) -> Result<AppStore<HttpCatalogClient>, CliError> {
    let api_base = cli
        .api_base
        .clone()
        .or_else(|| env::var("REEL_API_BASE").ok())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
    let user_id = cli
        .user
        .clone()
        .or_else(|| env::var("REEL_USER_ID").ok())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());

    let client = HttpCatalogClient::new(api_base)?;
    let cache = StateCache::new(resolve_data_dir(cli.data_dir.clone()));
    Ok(AppStore::boot(cache, client, &user_id))
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Ok(dir) = env::var("REEL_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reel")
}

async fn run_add(
    store: &mut AppStore<HttpCatalogClient>,
    date: String,
    title: String,
    comment: String,
    poster: Option<String>,
    lookup: bool,
) -> Result<(), CliError> {
    store.refresh().await;

    let mut draft = MovieDraft {
        date,
        title,
        comment,
        poster: poster.unwrap_or_default(),
        ..Default::default()
    };

    if lookup {
        fill_from_catalog(&mut draft).await;
    }

    let added = store.add(draft).await?;
    if added.id.is_local() {
        tracing::warn!(id = %added.id, "Backend unreachable; entry saved locally");
        eprintln!("Backend unreachable; entry saved locally");
    }
    println!("{}", added.id);
    Ok(())
}

/// Take the first catalog suggestion for the draft's title, if any.
async fn fill_from_catalog(draft: &mut MovieDraft) {
    let lookup = LookupClient::from_env();
    let Some(suggestion) = lookup.search(&draft.title).await.into_iter().next() else {
        return;
    };

    draft.tmdb_id = Some(suggestion.tmdb_id);
    if draft.poster.is_empty() {
        if let Some(poster) = suggestion.poster {
            draft.poster = poster;
        }
    }
    draft.genres = lookup.genres(suggestion.tmdb_id).await;
}

async fn run_list(
    store: &mut AppStore<HttpCatalogClient>,
    limit: usize,
    sort: SortKey,
    genre: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    store.refresh().await;

    let mut movies: Vec<MovieEntry> = store
        .state()
        .movies
        .iter()
        .filter(|movie| matches_genre(movie, genre))
        .cloned()
        .collect();

    match sort {
        SortKey::Date => movies.sort_by(|a, b| b.date.cmp(&a.date)),
        SortKey::Title => {
            movies.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        }
    }
    movies.truncate(limit);

    print_movies(&movies, as_json)
}

async fn run_search(
    store: &mut AppStore<HttpCatalogClient>,
    query: &str,
    limit: usize,
    as_json: bool,
) -> Result<(), CliError> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(CliError::EmptySearchQuery);
    }

    store.refresh().await;

    let mut movies: Vec<MovieEntry> = store
        .state()
        .movies
        .iter()
        .filter(|movie| {
            movie.title.to_lowercase().contains(&query)
                || movie.comment.to_lowercase().contains(&query)
        })
        .cloned()
        .collect();
    movies.truncate(limit);

    print_movies(&movies, as_json)
}

async fn run_edit(
    store: &mut AppStore<HttpCatalogClient>,
    id: &str,
    date: Option<String>,
    title: Option<String>,
    comment: Option<String>,
    poster: Option<String>,
) -> Result<(), CliError> {
    let patch = MoviePatch {
        date,
        title,
        comment,
        poster,
        ..Default::default()
    };
    if patch.is_empty() {
        return Err(CliError::EmptyPatch);
    }

    store.refresh().await;

    let updated = store.update(&MovieId::from(id), patch).await?;
    println!("{}", updated.id);
    Ok(())
}

async fn run_delete(store: &mut AppStore<HttpCatalogClient>, id: &str) -> Result<(), CliError> {
    store.refresh().await;
    store.delete(&MovieId::from(id)).await?;
    println!("{id}");
    Ok(())
}

async fn run_lookup(query: &str) -> Result<(), CliError> {
    let lookup = LookupClient::from_env();
    if !lookup.is_enabled() {
        eprintln!("Catalog lookup disabled (set REEL_TMDB_KEY to enable)");
        return Ok(());
    }

    let suggestions = lookup.search(query).await;
    if suggestions.is_empty() {
        println!("No suggestions");
        return Ok(());
    }
    for suggestion in suggestions {
        match suggestion.poster {
            Some(poster) => println!("{}  {}  {poster}", suggestion.tmdb_id, suggestion.title),
            None => println!("{}  {}", suggestion.tmdb_id, suggestion.title),
        }
    }
    Ok(())
}

async fn run_sync(store: &mut AppStore<HttpCatalogClient>) -> Result<(), CliError> {
    let reachable = store.refresh().await;
    let count = store.state().movies.len();
    if reachable {
        println!("Synced with backend ({count} entries)");
    } else {
        println!("Backend unreachable; showing cached data ({count} entries)");
    }
    Ok(())
}

fn matches_genre(movie: &MovieEntry, genre: Option<&str>) -> bool {
    match genre {
        Some(genre) => movie
            .genres
            .iter()
            .any(|name| name.eq_ignore_ascii_case(genre)),
        None => true,
    }
}

fn print_movies(movies: &[MovieEntry], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(movies)?);
        return Ok(());
    }
    if movies.is_empty() {
        println!("No entries");
        return Ok(());
    }
    for movie in movies {
        println!("{}", format_movie_line(movie));
    }
    Ok(())
}

fn format_movie_line(movie: &MovieEntry) -> String {
    let mut line = format!("{}  {}", movie.date, movie.title);
    if !movie.genres.is_empty() {
        line.push_str(&format!("  [{}]", movie.genres.join(", ")));
    }
    if !movie.comment.is_empty() {
        line.push_str(&format!("  \"{}\"", comment_preview(&movie.comment)));
    }
    line.push_str(&format!("  ({})", movie.id));
    line
}

fn comment_preview(comment: &str) -> String {
    const MAX_LEN: usize = 60;
    let first_line = comment.lines().next().unwrap_or("");
    if first_line.chars().count() <= MAX_LEN {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(MAX_LEN).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, date: &str, title: &str, genres: &[&str]) -> MovieEntry {
        MovieEntry {
            id: id.into(),
            user_id: "u1".into(),
            date: date.into(),
            title: title.into(),
            comment: String::new(),
            poster: String::new(),
            tmdb_id: None,
            genres: genres.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_matches_genre_is_case_insensitive() {
        let movie = entry("m1", "2024-01-01", "Alien", &["Horror", "Sci-Fi"]);
        assert!(matches_genre(&movie, Some("horror")));
        assert!(matches_genre(&movie, None));
        assert!(!matches_genre(&movie, Some("comedy")));
    }

    #[test]
    fn test_format_movie_line() {
        let mut movie = entry("m1", "2024-01-01", "Alien", &["Horror"]);
        movie.comment = "still great".into();
        assert_eq!(
            format_movie_line(&movie),
            "2024-01-01  Alien  [Horror]  \"still great\"  (m1)"
        );
    }

    #[test]
    fn test_comment_preview_truncates_first_line() {
        let long = "x".repeat(100);
        let preview = comment_preview(&long);
        assert_eq!(preview.chars().count(), 61);

        assert_eq!(comment_preview("one\ntwo"), "one");
    }
}
