//! Service layer: the ledger facade, the toggle protocol, statistics and
//! the outbound collaborators they talk to.
//!
//! Services receive their dependencies at construction; nothing here reads
//! the environment or process-wide state.

pub mod card_lookup;
pub mod ledger;
pub mod notification;
pub mod space_api;
pub mod statistics;
pub mod toggle;

#[cfg(test)]
#[path = "statistics_tests.rs"]
mod statistics_tests;


pub use card_lookup::{CardNameResolver, HttpCardResolver, LookupError};
pub use ledger::Ledger;
pub use notification::{NotificationDispatcher, Notifier, NotifyError, TelegramNotifier};
pub use space_api::{build_document, SpaceApiDocument, SpaceInfo};
pub use statistics::StatisticsService;
pub use toggle::{CardCredential, ToggleError, ToggleOutcome, ToggleService};
