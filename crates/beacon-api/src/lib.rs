//! Registry API server for the Beacon presence registry.
//!
//! Routing plumbing over the `beacon-core` engine: request validation,
//! JSON projection, conditional reads, and the janitor hook for eager
//! deployments. All state lives in [`state::AppState`]; handlers never
//! touch the stores except through its locks.
//!
//! # Modules
//!
//! - [`state`] -- Shared application state (stores, clock, config)
//! - [`router`] -- Axum router construction
//! - [`handlers`] -- Presence and player endpoints
//! - [`forcejoin`] -- Force-join command endpoints
//! - [`server`] -- HTTP server lifecycle
//! - [`error`] -- API error type and response mapping

pub mod error;
pub mod forcejoin;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
