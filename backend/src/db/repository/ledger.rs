//! Ledger repository trait.
//!
//! The ledger is an append-only table of [`StatusEvent`]s. Implementations
//! never update or delete a committed row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{AppendOutcome, EventId, NewStatusEvent, StatusEvent};

/// Storage operations backing the event ledger.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; one instance is shared by every
/// request handler.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Check that the store is reachable.
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// The event with the greatest timestamp (ties broken by id), or `None`
    /// for an empty ledger.
    async fn latest_event(&self) -> RepositoryResult<Option<StatusEvent>>;

    /// Unconditionally append an event and return it with its assigned id.
    async fn append_event(&self, event: NewStatusEvent) -> RepositoryResult<StatusEvent>;

    /// Append `event` only if the latest committed event is still
    /// `expected_latest` (`None` meaning the ledger must still be empty).
    ///
    /// The check and the insert are atomic with respect to other callers of
    /// this method.
    async fn append_if_latest(
        &self,
        expected_latest: Option<EventId>,
        event: NewStatusEvent,
    ) -> RepositoryResult<AppendOutcome>;

    /// Number of rows in the whole ledger.
    async fn count_events(&self) -> RepositoryResult<i64>;

    /// Events with `timestamp >= since`, ascending by timestamp then id.
    async fn events_since(&self, since: DateTime<Utc>) -> RepositoryResult<Vec<StatusEvent>>;
}
