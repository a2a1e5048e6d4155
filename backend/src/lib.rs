//! # Sede Backend
//!
//! Open/closed status service for a physical space, with historical
//! open-probability statistics.
//!
//! The state lives in an append-only event ledger: every toggle appends the
//! flipped state, the current state is the latest event, and the statistics
//! are recomputed from the events on each request.
//!
//! ## Architecture
//!
//! - [`models`]: events and derived statistics types
//! - [`db`]: ledger storage (in-memory and Postgres backends)
//! - [`services`]: ledger facade, toggle protocol, statistics, card lookup,
//!   notifications, SpaceAPI document
//! - [`config`]: application configuration and validation
//! - [`clock`]: injectable time source
//! - [`http`]: axum REST surface (feature `http-server`)

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod clock;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
