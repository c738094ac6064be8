use std::env;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";
const DEFAULT_DB_PATH: &str = "reel-db.json";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
}

impl ServerConfig {
    /// Read configuration from the environment, with development defaults.
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("REEL_SERVER_ADDR")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            db_path: env::var("REEL_DB_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
        }
    }
}
