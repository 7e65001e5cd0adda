//! # geowatch-server
//!
//! HTTP server for the geowatch geofence monitoring service.
//!
//! This binary provides:
//! - REST API for geofences, location updates and region events
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package geowatch-server
//!
//! # Alternate config file
//! GEOWATCH_CONFIG=./geowatch.toml ./geowatch-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;

use anyhow::Context;
use geowatch_core::{default_config_path, Config, JsonFileStore};
use geowatch_server::{api, logging, state::AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Environment variable overriding the config file location.
const CONFIG_PATH_ENV: &str = "GEOWATCH_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os(CONFIG_PATH_ENV)
        .map_or_else(default_config_path, PathBuf::from);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    logging::init(config.server.production)?;
    info!(config = %config_path.display(), "Starting geowatch-server");

    let bind = config.server.bind.clone();
    let store = Box::new(JsonFileStore::new(&config.storage.data_dir));
    info!(path = %store.path().display(), "using geofence store");

    let (scheduler, state) = AppState::build(config, store)?;
    let handle = state.scheduler.clone();
    let scheduler_task = tokio::spawn(scheduler.run());

    let app = api::create_router(state);
    let listener = TcpListener::bind(bind.as_str())
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("Listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, stopping scheduler");
    if let Err(e) = handle.shutdown().await {
        warn!(error = %e, "scheduler already stopped");
    }
    scheduler_task.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
