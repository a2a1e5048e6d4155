//! Storage layer for the event ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  services::ledger::Ledger (timeouts, policy)            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  LedgerRepository trait (repository/)                   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴────────────────┐
//!     │                                │
//! ┌───▼──────────────┐     ┌───────────▼─────────────┐
//! │ LocalRepository  │     │ PostgresRepository      │
//! │ (in-memory)      │     │ (Diesel + r2d2)         │
//! └──────────────────┘     └─────────────────────────┘
//! ```
//!
//! Backends are constructed explicitly through [`RepositoryFactory`] and
//! injected into the services; there is no process-wide repository.

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

#[cfg(feature = "postgres-repo")]
pub use repositories::postgres::PostgresConfig;

/// Placeholder so configuration code compiles without the Postgres backend.
#[cfg(not(feature = "postgres-repo"))]
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    _private: (),
}

pub use factory::{RepositoryFactory, RepositoryType};
pub use repo_config::RepositoryConfig;
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{
    ErrorContext, LedgerRepository, RepositoryError, RepositoryResult,
};
