mod config;
mod db;
mod error;
mod routes;

use config::ServerConfig;
use db::JsonDb;
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("reel_server=info".parse().expect("valid directive")),
        )
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(?config, "Starting reel-server");

    let state = AppState::new(JsonDb::new(&config.db_path));
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("reel-server listening on {}", config.bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
