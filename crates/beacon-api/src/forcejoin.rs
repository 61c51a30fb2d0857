//! Force-join command endpoint handlers.
//!
//! One-way operator directives: issue fans a command out to one or more
//! usernames, the target's client consumes it at most once, and a status
//! listing shows what is pending or recently delivered.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/forcejoin` | Issue a command to one or more users |
//! | `GET` | `/api/forcejoin/{username}` | Consume the pending command |
//! | `GET` | `/api/forcejoin` | List all commands with remaining TTL |
//! | `DELETE` | `/api/forcejoin/{username}` | Cancel the pending command |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// One username or a list of them; the wire contract accepts both.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum TargetUsernames {
    /// A single username.
    One(String),
    /// A list of usernames.
    Many(Vec<String>),
}

impl Default for TargetUsernames {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl TargetUsernames {
    /// Flatten into a vector for the queue.
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name],
            Self::Many(names) => names,
        }
    }
}

/// Request body for `POST /api/forcejoin`.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueForceJoinRequest {
    /// Target usernames (required, string or list).
    #[serde(default)]
    pub target_usernames: TargetUsernames,
    /// Place the users should join (required).
    #[serde(default)]
    pub place_id: String,
    /// Job the users should join (required).
    #[serde(default)]
    pub job_id: String,
    /// Who is issuing the command.
    pub issuer: Option<String>,
}

// ---------------------------------------------------------------------------
// POST /api/forcejoin -- issue
// ---------------------------------------------------------------------------

/// Issue a force-join command to each target username, overwriting any
/// pending command per user.
pub async fn issue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IssueForceJoinRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let targets = body.target_usernames.into_vec();
    let mut queue = state.commands.write().await;
    let queued = queue.issue(
        &targets,
        &body.place_id,
        &body.job_id,
        body.issuer.as_deref(),
    )?;
    let expires = queue.ttl_secs();
    drop(queue);

    info!(queued, expires, "force-join commands issued");

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("queued {queued} force-join command(s)"),
        "expires": expires,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/forcejoin/{username} -- consume
// ---------------------------------------------------------------------------

/// Deliver the pending command for a username, at most once.
///
/// A miss (unknown user, or a command already delivered) is
/// `{hasCommand:false}`, not an error.
pub async fn consume(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.sweep_for_read().await;
    let delivered = state.commands.write().await.consume(&username);

    let body = delivered.map_or_else(
        || serde_json::json!({ "hasCommand": false }),
        |command| {
            info!(username = %command.username, "force-join command delivered");
            serde_json::json!({
                "hasCommand": true,
                "placeId": command.place_id,
                "jobId": command.job_id,
                "issuer": command.issuer,
            })
        },
    );
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// GET /api/forcejoin -- status
// ---------------------------------------------------------------------------

/// List every command, pending and delivered, with remaining TTL seconds.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.sweep_for_read().await;
    let commands = state.commands.read().await.status();

    Ok(Json(serde_json::json!({
        "total": commands.len(),
        "commands": commands,
    })))
}

// ---------------------------------------------------------------------------
// DELETE /api/forcejoin/{username} -- cancel
// ---------------------------------------------------------------------------

/// Cancel the pending command for a username.
///
/// Unlike consume, a miss here is surfaced: `404` with a distinguishable
/// "nothing to cancel" message.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if state.commands.write().await.cancel(&username) {
        Ok(Json(serde_json::json!({ "success": true })))
    } else {
        Err(ApiError::NotFound(format!(
            "no force-join command for {username}"
        )))
    }
}
