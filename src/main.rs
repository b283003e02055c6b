// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::field_resolver::FieldResolver;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_repository::HttpDashboardRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;
use crate::presentation::session_registry::spawn_idle_sweep;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Create repository (infrastructure layer); it also serves chart field discovery
    let repository = Arc::new(HttpDashboardRepository::new(
        config.api.host,
        config.api.token,
        Duration::from_secs(config.api.timeout_secs),
    )?);

    // Create services (application layer)
    let resolver = FieldResolver::new(repository.clone(), config.resolver.max_concurrent_fetches);
    let state = Arc::new(AppState::new(repository, resolver));
    spawn_idle_sweep(
        state.sessions.clone(),
        Duration::from_secs(config.sessions.idle_timeout_secs),
        Duration::from_secs(config.sessions.sweep_interval_secs),
    );

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_addr))?;
    tracing::info!("Starting dashboard-composer service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
