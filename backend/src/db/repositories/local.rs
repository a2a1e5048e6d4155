//! In-memory ledger implementation.
//!
//! Suitable for unit tests and local development. Rows live in a `Vec`
//! behind a single lock, which also makes the conditional append atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use crate::db::repository::{ErrorContext, LedgerRepository, RepositoryError, RepositoryResult};
use crate::models::{AppendOutcome, EventId, NewStatusEvent, StatusEvent};

/// In-memory ledger.
///
/// Clones share the same storage.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use sede::db::repositories::LocalRepository;
/// use sede::db::LedgerRepository;
/// use sede::models::NewStatusEvent;
///
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// rt.block_on(async {
///     let repo = LocalRepository::new();
///     repo.append_event(NewStatusEvent::new(true, Utc::now())).await.unwrap();
///     assert_eq!(repo.count_events().await.unwrap(), 1);
/// });
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    events: Vec<StatusEvent>,
    next_event_id: i64,
    // Failure injection for tests
    is_healthy: bool,
    latency: Option<Duration>,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            next_event_id: 1,
            is_healthy: true,
            latency: None,
        }
    }
}

impl LocalData {
    fn insert(&mut self, event: NewStatusEvent) -> StatusEvent {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        let stored = event.with_id(id);
        self.events.push(stored.clone());
        stored
    }

    fn latest(&self) -> Option<&StatusEvent> {
        self.events
            .iter()
            .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)))
    }
}

impl LocalRepository {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed events directly, bypassing health and latency simulation.
    pub fn insert_events<I>(&self, events: I) -> Vec<StatusEvent>
    where
        I: IntoIterator<Item = NewStatusEvent>,
    {
        let mut data = self.data.write();
        events.into_iter().map(|e| data.insert(e)).collect()
    }

    /// Snapshot of every stored event in insertion order.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.data.read().events.clone()
    }

    pub fn event_count(&self) -> usize {
        self.data.read().events.len()
    }

    /// Simulate a storage outage: every operation fails with a connection error.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Delay every operation, to exercise deadline handling.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.data.write().latency = latency;
    }

    async fn simulate(&self, operation: &str) -> RepositoryResult<()> {
        let (healthy, latency) = {
            let data = self.data.read();
            (data.is_healthy, data.latency)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn latest_event(&self) -> RepositoryResult<Option<StatusEvent>> {
        self.simulate("latest_event").await?;
        Ok(self.data.read().latest().cloned())
    }

    async fn append_event(&self, event: NewStatusEvent) -> RepositoryResult<StatusEvent> {
        self.simulate("append_event").await?;
        Ok(self.data.write().insert(event))
    }

    async fn append_if_latest(
        &self,
        expected_latest: Option<EventId>,
        event: NewStatusEvent,
    ) -> RepositoryResult<AppendOutcome> {
        self.simulate("append_if_latest").await?;
        let mut data = self.data.write();
        let current = data.latest().cloned();
        if current.as_ref().map(|e| e.id) != expected_latest {
            return Ok(AppendOutcome::Stale(current));
        }
        Ok(AppendOutcome::Appended(data.insert(event)))
    }

    async fn count_events(&self) -> RepositoryResult<i64> {
        self.simulate("count_events").await?;
        Ok(self.data.read().events.len() as i64)
    }

    async fn events_since(&self, since: DateTime<Utc>) -> RepositoryResult<Vec<StatusEvent>> {
        self.simulate("events_since").await?;
        let mut events: Vec<StatusEvent> = self
            .data
            .read()
            .events
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_empty_ledger_has_no_latest() {
        let repo = LocalRepository::new();
        assert_eq!(repo.latest_event().await.unwrap(), None);
        assert_eq!(repo.count_events().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_assigns_increasing_ids() {
        let repo = LocalRepository::new();
        let a = repo.append_event(NewStatusEvent::new(true, at(10, 0))).await.unwrap();
        let b = repo.append_event(NewStatusEvent::new(false, at(11, 0))).await.unwrap();
        assert!(a.id < b.id);
        assert_eq!(repo.latest_event().await.unwrap(), Some(b));
    }

    #[tokio::test]
    async fn test_latest_is_by_timestamp_not_insertion() {
        let repo = LocalRepository::new();
        repo.insert_events([
            NewStatusEvent::new(true, at(12, 0)),
            NewStatusEvent::new(false, at(9, 0)),
        ]);
        let latest = repo.latest_event().await.unwrap().unwrap();
        assert!(latest.is_open);
        assert_eq!(latest.timestamp, at(12, 0));
    }

    #[tokio::test]
    async fn test_equal_timestamps_resolve_to_last_inserted() {
        let repo = LocalRepository::new();
        let stored = repo.insert_events([
            NewStatusEvent::new(true, at(12, 0)),
            NewStatusEvent::new(false, at(12, 0)),
        ]);
        let latest = repo.latest_event().await.unwrap().unwrap();
        assert_eq!(latest.id, stored[1].id);
        assert!(!latest.is_open);
    }

    #[tokio::test]
    async fn test_append_if_latest_detects_stale_read() {
        let repo = LocalRepository::new();
        let first = repo.append_event(NewStatusEvent::new(true, at(10, 0))).await.unwrap();

        // Caller read an empty ledger, but an event landed since.
        let outcome = repo
            .append_if_latest(None, NewStatusEvent::new(true, at(10, 1)))
            .await
            .unwrap();
        assert_eq!(outcome, AppendOutcome::Stale(Some(first.clone())));
        assert_eq!(repo.event_count(), 1);

        let outcome = repo
            .append_if_latest(Some(first.id), NewStatusEvent::new(false, at(10, 2)))
            .await
            .unwrap();
        assert!(matches!(outcome, AppendOutcome::Appended(ref e) if !e.is_open));
        assert_eq!(repo.event_count(), 2);
    }

    #[tokio::test]
    async fn test_events_since_filters_and_sorts() {
        let repo = LocalRepository::new();
        repo.insert_events([
            NewStatusEvent::new(true, at(15, 0)),
            NewStatusEvent::new(false, at(8, 0)),
            NewStatusEvent::new(false, at(11, 0)),
        ]);
        let events = repo.events_since(at(10, 0)).await.unwrap();
        let stamps: Vec<_> = events.iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![at(11, 0), at(15, 0)]);
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails_operations() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.latest_event().await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConnectionError { .. }));
        assert_eq!(err.context().operation.as_deref(), Some("latest_event"));
    }
}
