//! Registry server entry point for the Beacon presence registry.
//!
//! Wires the engine to the outside world: loads configuration from the
//! environment, builds the shared application state with the system clock,
//! spawns the janitor timer task, and serves the HTTP API until the process
//! is terminated.
//!
//! # Architecture
//!
//! ```text
//! clients --> Axum handlers --> RegistryStore / CommandQueue
//!                                      ^
//!                     janitor task ----+ (periodic sweep)
//! ```

mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use beacon_api::server::start_server;
use beacon_api::state::AppState;
use beacon_core::clock::{Clock, SystemClock};

use crate::config::AppConfig;

/// Application entry point.
///
/// Initializes logging, loads configuration from environment variables,
/// builds the stores, then runs the janitor task and the HTTP server.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails to
/// bind or serve.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("beacon-server starting");

    let config = AppConfig::from_env()?;
    config.registry.validate()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        sweep_interval_ms = config.registry.sweep_interval_ms,
        consistency = ?config.registry.consistency,
        presence_capacity = config.registry.presence.capacity,
        player_capacity = config.registry.players.capacity,
        command_capacity = config.registry.force_join.capacity,
        "configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = Arc::new(AppState::new(config.registry.clone(), clock));

    spawn_janitor(Arc::clone(&state), config.registry.sweep_interval_ms);

    start_server(&config.server, state).await?;

    Ok(())
}

/// Spawn the background janitor task.
///
/// The task sweeps every store on a fixed interval. A sweep never fails;
/// whatever one tick misses, the next one picks up.
fn spawn_janitor(state: Arc<AppState>, interval_ms: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let stats = state.sweep_all().await;
            if !stats.is_noop() {
                info!(
                    demoted = stats.demoted,
                    deleted = stats.deleted,
                    evicted = stats.evicted,
                    "janitor tick"
                );
            }
        }
    });
}
