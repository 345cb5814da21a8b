//! Mesos Metrics Agent - container metrics enrichment daemon
//!
//! This binary runs next to a mesos agent on each node, gathering
//! per-container resource metrics and tagging them with task and
//! framework names before writing them out.

use agent_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    GatherLoop, Gatherer, MesosClient, MetadataCache,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod output;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting mesos-metrics-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    info!(mesos_agent_url = %config.mesos_agent_url, "Agent configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::MESOS_CLIENT).await;
    health_registry.register(components::GATHERER).await;
    health_registry.register(components::OUTPUT).await;

    // Initialize structured logger
    let logger = StructuredLogger::new(&config.mesos_agent_url);
    logger.log_startup(AGENT_VERSION);

    // Wire the gather pipeline
    let client = Arc::new(MesosClient::new(config.client_config())?);
    let cache = Arc::new(MetadataCache::new());
    let gatherer = Arc::new(Gatherer::new(client, cache.clone(), config.gather_config()));

    let (gather_loop, points_rx) = GatherLoop::new(gatherer, logger.clone());
    let gather_loop = gather_loop.with_health(health_registry.clone());

    let (shutdown_tx, _) = broadcast::channel(1);
    let gather_handle = tokio::spawn(gather_loop.run(shutdown_tx.subscribe()));
    let output_handle = tokio::spawn(output::write_points(
        points_rx,
        tokio::io::stdout(),
        health_registry.clone(),
    ));

    // Start health and metrics server
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), cache));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    // Stop the loop first; dropping its sink closes the point channel and
    // lets the output writer drain.
    let _ = shutdown_tx.send(());
    let _ = gather_handle.await;
    let _ = output_handle.await;
    api_handle.abort();

    info!("Shutting down");
    Ok(())
}
