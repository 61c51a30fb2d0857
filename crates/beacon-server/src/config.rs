//! Configuration loading for the registry server binary.
//!
//! All configuration is loaded from environment variables; every variable is
//! optional and falls back to the engine defaults. The deployment chooses
//! timeouts, capacities, the sweep interval, and the consistency mode here
//! -- the core never reads the environment itself.

use beacon_api::server::ServerConfig;
use beacon_core::config::{ConsistencyMode, RegistryConfig};

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid {name}: {reason}")]
    Invalid {
        /// The environment variable name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Complete server configuration: HTTP bind address plus engine settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP server bind settings.
    pub server: ServerConfig,
    /// Registry engine settings.
    pub registry: RegistryConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables (all optional):
    /// - `BEACON_HOST` / `BEACON_PORT` -- bind address (default `0.0.0.0:8080`)
    /// - `BEACON_PRESENCE_HEARTBEAT_SECS` / `BEACON_PRESENCE_LIVETIME_SECS` /
    ///   `BEACON_PRESENCE_CAPACITY` -- presence store settings
    /// - `BEACON_PLAYER_HEARTBEAT_SECS` / `BEACON_PLAYER_LIVETIME_SECS` /
    ///   `BEACON_PLAYER_CAPACITY` -- player store settings
    /// - `BEACON_FORCEJOIN_TTL_SECS` / `BEACON_FORCEJOIN_CAPACITY` -- command queue
    /// - `BEACON_SWEEP_INTERVAL_MS` -- janitor period
    /// - `BEACON_CONSISTENCY` -- `eager` or `lazy` (default `lazy`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is present but cannot
    /// be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut registry = RegistryConfig::default();

        if let Some(value) = env_parse("BEACON_PRESENCE_HEARTBEAT_SECS")? {
            registry.presence.heartbeat_timeout_secs = value;
        }
        if let Some(value) = env_parse("BEACON_PRESENCE_LIVETIME_SECS")? {
            registry.presence.livetime_timeout_secs = value;
        }
        if let Some(value) = env_parse("BEACON_PRESENCE_CAPACITY")? {
            registry.presence.capacity = value;
        }
        if let Some(value) = env_parse("BEACON_PLAYER_HEARTBEAT_SECS")? {
            registry.players.heartbeat_timeout_secs = value;
        }
        if let Some(value) = env_parse("BEACON_PLAYER_LIVETIME_SECS")? {
            registry.players.livetime_timeout_secs = value;
        }
        if let Some(value) = env_parse("BEACON_PLAYER_CAPACITY")? {
            registry.players.capacity = value;
        }
        if let Some(value) = env_parse("BEACON_FORCEJOIN_TTL_SECS")? {
            registry.force_join.ttl_secs = value;
        }
        if let Some(value) = env_parse("BEACON_FORCEJOIN_CAPACITY")? {
            registry.force_join.capacity = value;
        }
        if let Some(value) = env_parse("BEACON_SWEEP_INTERVAL_MS")? {
            registry.sweep_interval_ms = value;
        }
        if let Ok(mode) = std::env::var("BEACON_CONSISTENCY") {
            registry.consistency = match mode.to_lowercase().as_str() {
                "eager" => ConsistencyMode::Eager,
                "lazy" => ConsistencyMode::Lazy,
                other => {
                    return Err(ConfigError::Invalid {
                        name: "BEACON_CONSISTENCY",
                        reason: format!("expected eager or lazy, got {other}"),
                    })
                }
            };
        }

        let mut server = ServerConfig::default();
        if let Ok(host) = std::env::var("BEACON_HOST") {
            server.host = host;
        }
        if let Some(port) = env_parse("BEACON_PORT")? {
            server.port = port;
        }

        Ok(Self { server, registry })
    }
}

/// Parse an optional environment variable, erroring only on bad values.
fn env_parse<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
