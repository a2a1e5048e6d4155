//! Deadline-bounded facade over a [`LedgerRepository`].
//!
//! Every call is wrapped in [`tokio::time::timeout`]; an expired deadline is
//! reported as [`RepositoryError::TimeoutError`] so callers can tell a slow
//! store apart from a failing one.
//!
//! Reads are abandoned at the deadline. Writes are not: a store may run the
//! insert on a blocking thread that dropping the future cannot stop, so a
//! write past its deadline is awaited until the store reports what actually
//! happened. A write only ever surfaces as an error when nothing was
//! committed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;

use crate::db::repository::{ErrorContext, LedgerRepository, RepositoryError, RepositoryResult};
use crate::models::{AppendOutcome, EventId, NewStatusEvent, StatusEvent};

/// Default deadline for a single ledger operation.
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Append-only event ledger.
#[derive(Clone)]
pub struct Ledger {
    repository: Arc<dyn LedgerRepository>,
    timeout: Duration,
}

impl Ledger {
    pub fn new(repository: Arc<dyn LedgerRepository>) -> Self {
        Self {
            repository,
            timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Latest event, or `None` when the ledger has no history.
    pub async fn get_latest(&self) -> RepositoryResult<Option<StatusEvent>> {
        self.bounded("latest_event", self.repository.latest_event())
            .await
    }

    /// Current state; an empty ledger reads as closed.
    pub async fn current_state(&self) -> RepositoryResult<bool> {
        Ok(self
            .get_latest()
            .await?
            .map(|event| event.is_open)
            .unwrap_or(false))
    }

    pub async fn append(&self, event: NewStatusEvent) -> RepositoryResult<StatusEvent> {
        let repository = Arc::clone(&self.repository);
        self.bounded_write("append_event", async move {
            repository.append_event(event).await
        })
        .await
    }

    /// Conditional append; see [`LedgerRepository::append_if_latest`].
    pub async fn append_if_latest(
        &self,
        expected_latest: Option<EventId>,
        event: NewStatusEvent,
    ) -> RepositoryResult<AppendOutcome> {
        let repository = Arc::clone(&self.repository);
        self.bounded_write("append_if_latest", async move {
            repository.append_if_latest(expected_latest, event).await
        })
        .await
    }

    pub async fn count(&self) -> RepositoryResult<i64> {
        self.bounded("count_events", self.repository.count_events())
            .await
    }

    pub async fn events_since(&self, since: DateTime<Utc>) -> RepositoryResult<Vec<StatusEvent>> {
        self.bounded("events_since", self.repository.events_since(since))
            .await
    }

    pub async fn health_check(&self) -> RepositoryResult<bool> {
        self.bounded("health_check", self.repository.health_check())
            .await
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> RepositoryResult<T>
    where
        F: Future<Output = RepositoryResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Ledger operation '{}' exceeded {:?}",
                    operation, self.timeout
                );
                Err(self.deadline_exceeded(operation))
            }
        }
    }

    /// Run a write on its own task and wait for its real outcome.
    ///
    /// Past the deadline a committed write is still returned as success;
    /// a write that failed late is reported as a timeout.
    async fn bounded_write<T, F>(&self, operation: &str, fut: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: Future<Output = RepositoryResult<T>> + Send + 'static,
    {
        let mut task = tokio::spawn(fut);
        let joined = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    "Ledger write '{}' exceeded {:?}; waiting for the store to settle",
                    operation, self.timeout
                );
                return match task.await {
                    Ok(Ok(value)) => {
                        warn!("Ledger write '{}' committed after its deadline", operation);
                        Ok(value)
                    }
                    Ok(Err(e)) => {
                        warn!("Ledger write '{}' failed after its deadline: {}", operation, e);
                        Err(self.deadline_exceeded(operation))
                    }
                    Err(e) => Err(join_error(operation, e)),
                };
            }
        };
        joined.map_err(|e| join_error(operation, e))?
    }

    fn deadline_exceeded(&self, operation: &str) -> RepositoryError {
        RepositoryError::timeout(
            format!("Ledger operation did not finish within {:?}", self.timeout),
            ErrorContext::new(operation),
        )
    }
}

fn join_error(operation: &str, err: tokio::task::JoinError) -> RepositoryError {
    RepositoryError::internal_with_context(
        format!("Task join error: {}", err),
        ErrorContext::new(operation),
    )
}
