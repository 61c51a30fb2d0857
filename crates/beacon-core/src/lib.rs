//! TTL registry engine for the Beacon presence registry.
//!
//! This crate contains everything with real invariants: the generic
//! TTL-bounded [`store::RegistryStore`] with its two-stage expiry state
//! machine, the deterministic [`evict`] policy, the at-most-once
//! [`commands::CommandQueue`], the [`janitor`] sweep contract, and the
//! [`fingerprint`] digest used for conditional reads. The HTTP surface in
//! `beacon-api` is routing plumbing over these types.
//!
//! # Modules
//!
//! - [`clock`] -- Injected time source (`SystemClock` in production, `ManualClock` in tests)
//! - [`config`] -- Typed configuration with validation
//! - [`store`] -- Generic TTL registry store and the record contract
//! - [`evict`] -- Pure capacity-eviction policy
//! - [`commands`] -- Force-join command queue with at-most-once delivery
//! - [`janitor`] -- Sweep statistics and the sweep contract
//! - [`fingerprint`] -- Content digest of an active-set snapshot
//! - [`error`] -- Error taxonomy for the engine

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod evict;
pub mod fingerprint;
pub mod janitor;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::{CommandQueue, CommandStatus};
pub use config::{ConsistencyMode, QueueConfig, RegistryConfig, StoreConfig};
pub use error::RegistryError;
pub use fingerprint::fingerprint;
pub use janitor::SweepStats;
pub use store::{PlayerPatch, PresencePatch, RegistryRecord, RegistryStore};
