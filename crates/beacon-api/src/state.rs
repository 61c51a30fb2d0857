//! Shared application state for the registry API server.
//!
//! [`AppState`] owns the three stores behind `tokio::sync::RwLock`s, the
//! injected clock, and the engine configuration. One logical store instance
//! per process: every mutation and snapshot goes through these locks, which
//! is all the serialization the in-memory engine needs.

use std::sync::Arc;

use beacon_core::clock::Clock;
use beacon_core::commands::CommandQueue;
use beacon_core::config::{ConsistencyMode, RegistryConfig};
use beacon_core::janitor::SweepStats;
use beacon_core::store::RegistryStore;
use beacon_types::{PlayerRecord, PresenceRecord};
use tokio::sync::RwLock;
use tracing::debug;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The janitor
/// timer task and the handlers share the same instance, so a sweep and a
/// read serialize on the store locks.
pub struct AppState {
    /// Presence registry.
    pub presence: RwLock<RegistryStore<PresenceRecord>>,
    /// Player-location registry.
    pub players: RwLock<RegistryStore<PlayerRecord>>,
    /// Force-join command queue.
    pub commands: RwLock<CommandQueue>,
    /// Injected time source, shared with the stores.
    pub clock: Arc<dyn Clock>,
    /// Engine configuration as loaded at startup.
    pub config: RegistryConfig,
}

impl AppState {
    /// Create application state with empty stores.
    ///
    /// The same clock instance is handed to every store so that tests
    /// driving a [`ManualClock`](beacon_core::clock::ManualClock) advance
    /// all of them together.
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            presence: RwLock::new(RegistryStore::new(config.presence, Arc::clone(&clock))),
            players: RwLock::new(RegistryStore::new(config.players, Arc::clone(&clock))),
            commands: RwLock::new(CommandQueue::new(config.force_join, Arc::clone(&clock))),
            clock,
            config,
        }
    }

    /// Run one janitor sweep over every managed store.
    ///
    /// Each store's transition and eviction passes are applied under its
    /// write lock as a unit. Never fails; a sweep that finds nothing to do
    /// is a no-op.
    pub async fn sweep_all(&self) -> SweepStats {
        let presence = self.presence.write().await.sweep();
        let players = self.players.write().await.sweep();
        let commands = self.commands.write().await.sweep();

        let merged = presence.merged(players).merged(commands);
        if !merged.is_noop() {
            debug!(
                demoted = merged.demoted,
                deleted = merged.deleted,
                evicted = merged.evicted,
                "janitor sweep applied"
            );
        }
        merged
    }

    /// Sweep inline if the deployment runs in eager consistency mode.
    ///
    /// Called by read handlers before taking their snapshot, so an eager
    /// deployment never serves a logically-expired record. Lazy deployments
    /// rely solely on the timer and accept staleness bounded by the sweep
    /// interval.
    pub async fn sweep_for_read(&self) {
        if self.config.consistency == ConsistencyMode::Eager {
            self.sweep_all().await;
        }
    }
}
