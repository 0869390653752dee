use std::sync::Arc;

use interaction_tsdb::http::WebServer;
use interaction_tsdb::observability::init_tracing;
use interaction_tsdb::tsdb::RetentionSweeper;
use interaction_tsdb::{Config, InMemoryTsdb, InteractionService, ModelRollups, TsdbBackend};
use tracing::{info, warn};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load()?;
    init_tracing(&config.logging)?;

    let store: Arc<dyn TsdbBackend> = Arc::new(
        InMemoryTsdb::new(ModelRollups::uniform(config.tsdb.rollups.clone()))
            .with_max_points(config.tsdb.max_points),
    );
    let registry = Arc::new(config.build_registry()?);
    info!(
        apps = registry.len(),
        rollups = config.tsdb.rollups.len(),
        "Counter store ready"
    );

    let sweeper = RetentionSweeper::new(store.clone(), config.tsdb.sweep_interval()).spawn();

    let service = Arc::new(
        InteractionService::new(store, registry).with_max_points(config.tsdb.max_points),
    );
    WebServer::new(service)
        .start(config.server.bind_addr, shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Interaction API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
