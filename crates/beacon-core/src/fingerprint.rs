//! Content digest of an active-set snapshot for conditional reads.
//!
//! List endpoints hand the digest to clients as an `ETag`; a client that
//! sends it back gets `304 Not Modified` instead of the full body when
//! nothing changed. Equality is exact -- any field change, including
//! `last_seen`, changes the digest -- so this is a bandwidth optimization,
//! not a semantic dedup.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::RegistryError;

/// SHA-256 hex digest of a snapshot.
///
/// The snapshot must already be in canonical order (stores return key-ordered
/// snapshots) so that equal content always hashes identically.
///
/// # Errors
///
/// Returns [`RegistryError::Serialization`] if the snapshot cannot be
/// serialized to JSON.
pub fn fingerprint<T: Serialize>(snapshot: &[T]) -> Result<String, RegistryError> {
    let bytes = serde_json::to_vec(snapshot)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
