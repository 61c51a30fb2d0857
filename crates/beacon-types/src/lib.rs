//! Shared type definitions for the Beacon presence registry.
//!
//! This crate is the single source of truth for the domain types used across
//! the Beacon workspace: composite identity keys, the records tracked by the
//! registry stores, and the force-join command payload.
//!
//! # Modules
//!
//! - [`keys`] -- Validated composite identity keys for presence and player records
//! - [`records`] -- Registry record structs and the force-join command

pub mod keys;
pub mod records;

// Re-export all public types at crate root for convenience.
pub use keys::{normalize_username, require_field, IdentityError, PlayerKey, PresenceKey};
pub use records::{ForceJoinCommand, PlayerRecord, PresenceRecord, Source};
