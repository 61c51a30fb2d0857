//! Validated composite identity keys for the registry stores.
//!
//! Every record in the registry is addressed by a composite key whose parts
//! are trimmed and lowercased (where matching is case-insensitive) at
//! construction time. A key that exists is a key that is valid: blank parts
//! are rejected before they can reach a store, so the stores themselves never
//! have to re-validate identities.
//!
//! Keys derive [`Ord`] on their field tuple. Stores keep records in a
//! `BTreeMap`, so key order doubles as the deterministic tie-break when the
//! eviction policy has to choose between records with equal freshness.

use serde::{Deserialize, Serialize};

/// Errors produced when constructing an identity key from request input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// A required identity field was missing or blank after trimming.
    #[error("missing or blank required field: {field}")]
    BlankField {
        /// Name of the offending field, as it appears on the wire.
        field: &'static str,
    },
}

/// Trim a required identity part, rejecting blank input.
///
/// Exposed so the command queue can apply the same rule to its non-key
/// required fields (`placeId`, `jobId`).
///
/// # Errors
///
/// Returns [`IdentityError::BlankField`] if the value is empty after
/// trimming whitespace.
pub fn require_field(value: &str, field: &'static str) -> Result<String, IdentityError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::BlankField { field });
    }
    Ok(trimmed.to_owned())
}

/// Identity of a presence record: `(server_id, name, job_id)`.
///
/// `name` is matched case-insensitively and stored lowercased; all parts are
/// whitespace-trimmed. Construction fails if any part is blank.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceKey {
    /// Server identifier the sighting came from.
    pub server_id: String,
    /// Entity name, lowercased for case-insensitive matching.
    pub name: String,
    /// Job (game instance) identifier.
    pub job_id: String,
}

impl PresenceKey {
    /// Build a presence key from raw request fields.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::BlankField`] if any part is empty after
    /// trimming whitespace.
    pub fn new(server_id: &str, name: &str, job_id: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            server_id: require_field(server_id, "serverId")?,
            name: require_field(name, "name")?.to_lowercase(),
            job_id: require_field(job_id, "jobId")?,
        })
    }
}

/// Identity of a player-location record: `(username, server_id, job_id)`.
///
/// `username` is matched case-insensitively and stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerKey {
    /// Player username, lowercased for case-insensitive matching.
    pub username: String,
    /// Server identifier the heartbeat came from.
    pub server_id: String,
    /// Job (game instance) identifier.
    pub job_id: String,
}

impl PlayerKey {
    /// Build a player key from raw request fields.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::BlankField`] if any part is empty after
    /// trimming whitespace.
    pub fn new(username: &str, server_id: &str, job_id: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            username: require_field(username, "username")?.to_lowercase(),
            server_id: require_field(server_id, "serverId")?,
            job_id: require_field(job_id, "jobId")?,
        })
    }
}

/// Normalize a force-join target username: trim, reject blank, lowercase.
///
/// Command-queue identities are plain usernames rather than composite keys,
/// but they follow the same matching rules as [`PlayerKey::username`].
///
/// # Errors
///
/// Returns [`IdentityError::BlankField`] if the username is blank after
/// trimming.
pub fn normalize_username(username: &str) -> Result<String, IdentityError> {
    Ok(require_field(username, "username")?.to_lowercase())
}
