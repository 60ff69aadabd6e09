use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use awards_vote::config::Config;
use awards_vote::db::{self, Repository};
use awards_vote::identity::IdentityVerifier;
use awards_vote::session::SessionStore;
use awards_vote::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Awards Vote Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Identity provider: {}", config.provider_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Identity provider client, bounded by the configured timeout
    let identity = Arc::new(IdentityVerifier::new(
        &config.provider_url,
        config.provider_timeout,
    )?);

    // Create application state
    let state = AppState {
        repo,
        sessions: SessionStore::new(),
        identity,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
