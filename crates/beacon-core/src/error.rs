//! Error taxonomy for the registry engine.
//!
//! The only failures the engine surfaces to callers are validation
//! rejections; capacity pressure is absorbed by eviction and a consume miss
//! is a negative result, not an error. [`RegistryError`] unifies the engine's
//! failure modes into a single enum the API layer maps onto HTTP statuses.

use beacon_types::IdentityError;

/// Errors produced by the registry engine.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A required identity field was missing or blank on an ingest,
    /// heartbeat, or issue call.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A force-join issue call carried no target usernames.
    #[error("targetUsernames must contain at least one username")]
    EmptyTargets,

    /// The configuration is internally inconsistent.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },

    /// A snapshot could not be serialized for fingerprinting.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
