//! HTTP listener lifecycle for the registry API.
//!
//! The binary hands [`start_server`] a bind configuration and the shared
//! state; everything request-scoped lives in the router. Serving runs until
//! the process is killed -- the registry is in-memory, so there is nothing
//! to flush on the way down.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Bind configuration for the registry listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind, as a string (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Resolve the configured host/port pair into a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Address`] if the host is not a literal IP
    /// address; hostnames are deliberately not resolved here.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self.host.parse().map_err(|source| ServerError::Address {
            host: self.host.clone(),
            source,
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Bind the listener and serve the registry API until the process exits.
///
/// # Errors
///
/// Returns [`ServerError`] if the bind address is invalid, the port cannot
/// be bound, or the accept loop hits a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    info!(%addr, "registry server listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

/// Failures binding or running the registry listener.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured host is not a literal IP address.
    #[error("invalid bind host {host:?}: {source}")]
    Address {
        /// The host string as configured.
        host: String,
        /// The underlying parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// The listener could not bind to the resolved address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop hit a fatal I/O error.
    #[error("server I/O error: {0}")]
    Serve(#[from] std::io::Error),
}
