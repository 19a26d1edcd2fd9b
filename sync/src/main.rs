//! Canopy Sync daemon.
//!
//! Keeps the local replica of one builder's resource trees up to date until
//! interrupted.

use canopy_engine::{default_queues, Record};
use canopy_sync::{
    Config, ConfigError, HttpFetcher, JsonFileStore, LocalStore, MemoryStore, SharedSession,
    SyncScheduler, TreePuller,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "canopy_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let builder_id = config.builder_id.ok_or(ConfigError::MissingBuilderId)?;

    tracing::info!(
        remote = %config.remote_url,
        builder_id,
        "Starting Canopy Sync"
    );

    let store: Arc<dyn LocalStore> = match &config.store_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using JSON replica file");
            Arc::new(JsonFileStore::open(path)?)
        }
        None => {
            tracing::warn!("CANOPY_STORE_PATH not set, replica is kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let fetcher = Arc::new(HttpFetcher::from_config(&config)?);
    let builder = Record::from_value(json!({ "id": builder_id }))?;
    let session = Arc::new(SharedSession::signed_in(builder));

    let scheduler = SyncScheduler::new(
        default_queues(),
        TreePuller::new(store, fetcher),
        session,
        config.tick,
    )?;

    let (stop, shutdown) = watch::channel(false);
    let ticker = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run(shutdown).await }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    stop.send(true).ok();
    ticker.await?;

    Ok(())
}
