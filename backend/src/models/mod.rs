//! Domain types shared by the ledger, the services and the HTTP layer.

pub mod event;
pub mod stats;

pub use event::*;
pub use stats::*;
