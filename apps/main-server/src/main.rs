//! Task list server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use task_store::{
    MemoryTaskCache, MemoryTaskStore, PgTaskStore, RedisTaskCache, TaskCache, TaskRepository,
};
use tasklist_server::{config::Config, create_app, create_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        database_enabled = config.database_enabled(),
        redis_enabled = config.redis_url.is_some(),
        "Starting task list server"
    );

    let memory = MemoryTaskStore::seeded();

    let repository = match &config.database_url {
        Some(database_url) => {
            let store = PgTaskStore::connect(database_url, &config.store_options()).await?;
            store.init().await?;

            let cache = build_cache(&config).await;
            Some(TaskRepository::new(store, cache).with_ttl(config.cache_ttl))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, serving the in-memory task list only");
            None
        }
    };

    let state = create_state(config.clone(), memory, repository);
    let app = create_app(state);

    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(addr = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Picks Redis when configured, otherwise an in-process cache.
///
/// An unreachable Redis leaves the cache disconnected and reads miss until a
/// reconnect on use succeeds.
async fn build_cache(config: &Config) -> Arc<dyn TaskCache> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("REDIS_URL not set, using in-process cache");
        return Arc::new(MemoryTaskCache::new());
    };

    let cache = RedisTaskCache::new(redis_url);
    if let Err(e) = cache.connect().await {
        tracing::warn!(error = %e, "Redis unavailable, will retry on use");
    }
    Arc::new(cache)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
