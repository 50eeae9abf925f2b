use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use api::presence::{MemoryPresence, PresenceStore, RedisPresence};
use api::{routes, state::AppState};
use common::cache::{RedisConfig, RedisPool};
use common::config::{AppConfig, StorageBackend};
use common::database::{DatabaseConfig, init_pool};
use datastore::Stores;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting match service");

    let config = AppConfig::from_env()?;

    let (stores, presence): (Stores, Arc<dyn PresenceStore>) = match config.backend {
        StorageBackend::Postgres => {
            // Initialize database connection pool
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            // Check database connectivity
            if common::database::health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            datastore::postgres::ensure_schema(&pool).await?;
            info!("Database schema ready");

            let redis_config = RedisConfig::from_env()?;
            let redis = RedisPool::new(&redis_config).await?;

            let presence: Arc<dyn PresenceStore> = Arc::new(RedisPresence::new(redis));
            (Stores::postgres(pool), presence)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            let presence: Arc<dyn PresenceStore> = Arc::new(MemoryPresence::new());
            (Stores::memory(), presence)
        }
    };

    let app_state = AppState::new(stores, presence);

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Match service listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
