//! Repository trait definitions for ledger storage.
//!
//! - [`error`]: error taxonomy shared by every backend
//! - [`ledger`]: the [`LedgerRepository`] trait

pub mod error;
pub mod ledger;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};
pub use ledger::LedgerRepository;
