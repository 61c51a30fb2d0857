//! Axum router construction for the registry API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware, the same layering the rest of our HTTP services use.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::forcejoin;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the registry server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `POST /api/presence` / `GET /api/presence` / `DELETE /api/presence`
/// - `GET /api/presence/all` -- debug listing including inactive records
/// - `POST /api/presence/leave`
/// - `POST /api/players/heartbeat` / `GET /api/players`
/// - `POST /api/forcejoin` / `GET /api/forcejoin`
/// - `GET /api/forcejoin/{username}` / `DELETE /api/forcejoin/{username}`
///
/// CORS is configured to allow any origin for development. In production
/// this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Presence registry
        .route(
            "/api/presence",
            post(handlers::ingest_presence)
                .get(handlers::list_presence)
                .delete(handlers::clear_presence),
        )
        .route("/api/presence/all", get(handlers::list_presence_all))
        .route("/api/presence/leave", post(handlers::leave_presence))
        // Player registry
        .route("/api/players/heartbeat", post(handlers::player_heartbeat))
        .route("/api/players", get(handlers::list_players))
        // Force-join command queue
        .route(
            "/api/forcejoin",
            post(forcejoin::issue).get(forcejoin::status),
        )
        .route(
            "/api/forcejoin/{username}",
            get(forcejoin::consume).delete(forcejoin::cancel),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
