//! Configuration module for the awards-vote backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Base URL of the external identity provider
    pub provider_url: String,
    /// Upper bound on a single identity provider call
    pub provider_timeout: Duration,
    /// Minimum level required to mutate categories and themes
    pub registry_floor: i64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("AWARDS_DB_PATH")
            .unwrap_or_else(|_| "./data/app.sqlite".to_string())
            .into();

        let bind_addr = env::var("AWARDS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid AWARDS_BIND_ADDR format");

        let provider_url = env::var("AWARDS_PROVIDER_URL")
            .unwrap_or_else(|_| "https://identity.example.com".to_string());

        let provider_timeout = env::var("AWARDS_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let registry_floor = env::var("AWARDS_REGISTRY_FLOOR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let log_level = env::var("AWARDS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            bind_addr,
            provider_url,
            provider_timeout,
            registry_floor,
            log_level,
        }
    }
}
