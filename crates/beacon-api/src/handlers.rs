//! Presence and player endpoint handlers.
//!
//! All handlers go through the shared [`AppState`] locks; read handlers call
//! [`AppState::sweep_for_read`] first so eager deployments never serve
//! logically-expired records.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/presence` | Ingest a presence sighting |
//! | `GET` | `/api/presence` | List active presence (`ETag` conditional) |
//! | `GET` | `/api/presence/all` | Debug listing including inactive records |
//! | `POST` | `/api/presence/leave` | Mark a sighting inactive |
//! | `DELETE` | `/api/presence` | Clear all presence records |
//! | `POST` | `/api/players/heartbeat` | Player location heartbeat |
//! | `GET` | `/api/players` | List active players (`ETag` conditional) |

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use tracing::debug;

use beacon_core::fingerprint::fingerprint;
use beacon_core::store::{PlayerPatch, PresencePatch};
use beacon_types::{PlayerKey, PresenceKey, Source};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Request body for `POST /api/presence`.
///
/// Required fields default to empty strings so that an absent field fails
/// key validation (a 400 with the offending field named) rather than a
/// generic body-rejection.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestPresenceRequest {
    /// Entity name (required, case-insensitive).
    #[serde(default)]
    pub name: String,
    /// Server identifier (required).
    #[serde(default)]
    pub server_id: String,
    /// Job identifier (required).
    #[serde(default)]
    pub job_id: String,
    /// Observed player count.
    pub players: Option<u32>,
    /// Observed money-per-second rate.
    pub money_per_sec: Option<f64>,
    /// Origin of the report, stamped by the upstream admission layer.
    #[serde(default)]
    pub source: Source,
}

/// Request body for `POST /api/presence/leave`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeavePresenceRequest {
    /// Entity name (required, case-insensitive).
    #[serde(default)]
    pub name: String,
    /// Server identifier (required).
    #[serde(default)]
    pub server_id: String,
    /// Job identifier (required).
    #[serde(default)]
    pub job_id: String,
}

/// Request body for `POST /api/players/heartbeat`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerHeartbeatRequest {
    /// Player username (required, case-insensitive).
    #[serde(default)]
    pub username: String,
    /// Server identifier (required).
    #[serde(default)]
    pub server_id: String,
    /// Job identifier (required).
    #[serde(default)]
    pub job_id: String,
    /// Place the player is currently in.
    pub place_id: Option<String>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing registry counts and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let presence_count = state.presence.read().await.len();
    let player_count = state.players.read().await.len();
    let command_count = state.commands.read().await.len();

    Html(format!(
        r"<!DOCTYPE html>
<html lang='en'>
<head><meta charset='utf-8'><title>Beacon Registry</title></head>
<body style='font-family: monospace; max-width: 640px; margin: 2rem auto;'>
    <h1>Beacon Registry</h1>
    <p>Status: RUNNING</p>
    <ul>
        <li>presence records: {presence_count}</li>
        <li>player records: {player_count}</li>
        <li>pending commands: {command_count}</li>
    </ul>
    <h2>API</h2>
    <ul>
        <li>GET <a href='/api/presence'>/api/presence</a> -- active presence</li>
        <li>GET <a href='/api/presence/all'>/api/presence/all</a> -- full listing</li>
        <li>GET <a href='/api/players'>/api/players</a> -- active players</li>
        <li>GET <a href='/api/forcejoin'>/api/forcejoin</a> -- command status</li>
    </ul>
</body>
</html>"
    ))
}

// ---------------------------------------------------------------------------
// POST /api/presence -- ingest a sighting
// ---------------------------------------------------------------------------

/// Upsert a presence record from an ingest call.
///
/// Resets freshness and flips the record back to active; creates it if the
/// identity is new. Never evicts -- capacity is the janitor's job.
pub async fn ingest_presence(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestPresenceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = PresenceKey::new(&body.server_id, &body.name, &body.job_id)?;

    let created = state.presence.write().await.upsert(PresencePatch {
        key: key.clone(),
        players: body.players,
        money_per_sec: body.money_per_sec,
        source: body.source,
    });

    debug!(
        server_id = %key.server_id,
        name = %key.name,
        job_id = %key.job_id,
        created,
        "presence ingested"
    );

    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// GET /api/presence -- list active sightings
// ---------------------------------------------------------------------------

/// List all active presence records, with `ETag` conditional-read support.
///
/// A request carrying `If-None-Match` with the fingerprint of the current
/// snapshot gets `304 Not Modified` and an empty body.
pub async fn list_presence(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.sweep_for_read().await;
    let snapshot = state.presence.read().await.snapshot_active();
    let digest = fingerprint(&snapshot)?;

    if if_none_match_hits(&headers, &digest) {
        return Ok(not_modified(&digest));
    }

    let body: Vec<serde_json::Value> = snapshot
        .iter()
        .map(|record| {
            serde_json::json!({
                "name": record.key.name,
                "serverId": record.key.server_id,
                "jobId": record.key.job_id,
                "players": record.players,
                "moneyPerSec": record.money_per_sec,
                "lastSeen": record.last_seen,
                "source": record.source,
            })
        })
        .collect();

    Ok(with_etag(&digest, Json(body)))
}

// ---------------------------------------------------------------------------
// GET /api/presence/all -- debug listing
// ---------------------------------------------------------------------------

/// List every presence record, active or not, with its state flag.
pub async fn list_presence_all(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.sweep_for_read().await;
    let records = state.presence.read().await.all();
    Ok(Json(serde_json::to_value(records)?))
}

// ---------------------------------------------------------------------------
// POST /api/presence/leave -- explicit leave
// ---------------------------------------------------------------------------

/// Mark a presence record inactive. A no-op (still a success) if the
/// identity is unknown.
pub async fn leave_presence(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LeavePresenceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = PresenceKey::new(&body.server_id, &body.name, &body.job_id)?;
    let existed = state.presence.write().await.mark_inactive(&key);
    debug!(
        server_id = %key.server_id,
        name = %key.name,
        job_id = %key.job_id,
        existed,
        "presence leave"
    );
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// DELETE /api/presence -- clear all
// ---------------------------------------------------------------------------

/// Remove every presence record, reporting the count removed.
pub async fn clear_presence(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cleared = state.presence.write().await.clear();
    Json(serde_json::json!({ "success": true, "cleared": cleared }))
}

// ---------------------------------------------------------------------------
// POST /api/players/heartbeat -- player location heartbeat
// ---------------------------------------------------------------------------

/// Upsert a player-location record from a heartbeat.
pub async fn player_heartbeat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PlayerHeartbeatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = PlayerKey::new(&body.username, &body.server_id, &body.job_id)?;

    state.players.write().await.upsert(PlayerPatch {
        key,
        place_id: body.place_id,
    });

    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// GET /api/players -- list active players
// ---------------------------------------------------------------------------

/// List all active players with seconds since their last heartbeat, with
/// `ETag` conditional-read support.
pub async fn list_players(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.sweep_for_read().await;
    let snapshot = state.players.read().await.snapshot_active();
    let digest = fingerprint(&snapshot)?;

    if if_none_match_hits(&headers, &digest) {
        return Ok(not_modified(&digest));
    }

    let now = state.clock.now();
    let body: Vec<serde_json::Value> = snapshot
        .iter()
        .map(|record| {
            let silence = u64::try_from(
                now.signed_duration_since(record.last_seen).num_seconds(),
            )
            .unwrap_or(0);
            serde_json::json!({
                "username": record.key.username,
                "serverId": record.key.server_id,
                "jobId": record.key.job_id,
                "placeId": record.place_id,
                "secondsSinceLastSeen": silence,
            })
        })
        .collect();

    Ok(with_etag(&digest, Json(body)))
}

// ---------------------------------------------------------------------------
// Conditional-read helpers
// ---------------------------------------------------------------------------

/// Whether the request's `If-None-Match` matches the snapshot digest.
///
/// Accepts the quoted form we emit and a bare digest for lenient clients.
pub(crate) fn if_none_match_hits(headers: &HeaderMap, digest: &str) -> bool {
    headers
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_matches('"') == digest)
}

/// Build a `304 Not Modified` response carrying the `ETag`.
pub(crate) fn not_modified(digest: &str) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    if let Ok(value) = format!("\"{digest}\"").parse() {
        response.headers_mut().insert(ETAG, value);
    }
    response
}

/// Attach an `ETag` header to a JSON response.
pub(crate) fn with_etag(digest: &str, body: impl IntoResponse) -> Response {
    let mut response = body.into_response();
    if let Ok(value) = format!("\"{digest}\"").parse() {
        response.headers_mut().insert(ETAG, value);
    }
    response
}
