//! Gazette - a small server-rendered blog

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gazette::{
    api::{self, AppState},
    config::Config,
    db::{self, DatabasePool},
};

/// How often expired sessions are purged
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gazette=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gazette...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    pool.ping().await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!(applied, "Database migrations completed");

    let state = AppState::new(pool, &config)?;

    // Purge expired sessions in the background
    {
        let user_service = state.user_service.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                match user_service.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::info!(removed, "Expired sessions removed"),
                    Err(e) => tracing::warn!("Session cleanup failed: {}", e),
                }
            }
        });
    }

    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
