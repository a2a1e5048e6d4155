//! Postgres ledger implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2, sized once at startup
//! - Automatic retry for transient connection failures
//! - Conditional append serialized by a transaction-scoped advisory lock
//! - Per-operation deadline enforced on the blocking thread
//! - Automatic migration execution
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 25)
//! - `PG_POOL_MIN`: Minimum idle connections (default: 5)
//! - `PG_CONN_TIMEOUT_SEC`: Connection checkout timeout in seconds (default: 5)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 300)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)
//! - `PG_OPERATION_TIMEOUT_MS`: Deadline for one operation including retries
//!   (default: 25000)
//!
//! The operation deadline must stay below the ledger timeout. A write that
//! reaches its deadline is rolled back on the blocking thread, so by the time
//! the caller gives up nothing can still commit behind it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::BigInt;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{debug, warn};
use std::time::{Duration, Instant};
use tokio::task;

use crate::db::repository::{ErrorContext, LedgerRepository, RepositoryError, RepositoryResult};
use crate::models::{AppendOutcome, EventId, NewStatusEvent, StatusEvent};

mod models;
mod schema;

use models::{NewStatusRow, StatusRow};
use schema::sede_statuses;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Advisory lock key guarding conditional appends to the ledger.
const LEDGER_LOCK_KEY: i64 = 0x5EDE_0001;

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of idle connections kept open
    pub min_pool_size: u32,
    /// Connection checkout timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
    /// Deadline for a whole operation, retries included
    pub operation_timeout_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 25,
            min_pool_size: 5,
            connection_timeout_sec: 5,
            idle_timeout_sec: 300,
            max_retries: 3,
            retry_delay_ms: 100,
            operation_timeout_ms: 25_000,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
            operation_timeout_ms: env_or("PG_OPERATION_TIMEOUT_MS", defaults.operation_timeout_ms),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Worst case spent waiting on connection checkouts across all attempts.
    pub fn checkout_budget(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_sec) * (self.max_retries + 1)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Time left before `deadline`, or a timeout error once it has passed.
fn remaining(deadline: Instant, operation: &str) -> RepositoryResult<Duration> {
    match deadline.checked_duration_since(Instant::now()) {
        Some(left) if !left.is_zero() => Ok(left),
        _ => Err(RepositoryError::timeout(
            "Operation deadline reached",
            ErrorContext::new(operation),
        )),
    }
}

/// Diesel-backed ledger on Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        if config.checkout_budget() >= config.operation_timeout() {
            warn!(
                "Postgres checkout budget {:?} exceeds operation timeout {:?}; later retries will be cut short",
                config.checkout_budget(),
                config.operation_timeout()
            );
        }

        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Migration failed: {}", e),
                    ErrorContext::new("run_migrations"),
                )
            })?;
        }

        Ok(Self { pool, config })
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`.
    ///
    /// Retries with exponential backoff while the failure is retryable
    /// (connection acquisition, serialization failures) and the operation
    /// deadline has not passed. Those failures guarantee nothing was
    /// committed, so retrying an append cannot duplicate a row.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection, Instant) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let checkout_timeout = Duration::from_secs(self.config.connection_timeout_sec);
        let mut retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let deadline = Instant::now() + self.config.operation_timeout();

        task::spawn_blocking(move || {
            let mut attempt = 0;

            loop {
                let left = remaining(deadline, operation)?;
                let result = match pool.get_timeout(left.min(checkout_timeout)) {
                    Ok(mut conn) => f.clone()(&mut conn, deadline),
                    Err(e) => Err(RepositoryError::connection_with_context(
                        e.to_string(),
                        ErrorContext::new("get_connection")
                            .with_details(format!("attempt={}", attempt + 1)),
                    )),
                };

                match result {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        warn!("{} failed on attempt {}: {}; retrying", operation, attempt + 1, e);
                        std::thread::sleep(retry_delay.min(remaining(deadline, operation)?));
                        retry_delay *= 2;
                        attempt += 1;
                    }
                    Err(e) => return Err(e.with_operation(operation)),
                }
            }
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new(operation),
            )
        })?
    }
}

/// Run a write transaction that cannot outlive `deadline`.
///
/// Statement and lock waits are capped server-side, and the deadline is
/// checked again right before COMMIT; missing it rolls the transaction back.
fn write_within<T, F>(
    conn: &mut PgConnection,
    deadline: Instant,
    operation: &str,
    body: F,
) -> RepositoryResult<T>
where
    F: FnOnce(&mut PgConnection) -> RepositoryResult<T>,
{
    conn.transaction::<_, RepositoryError, _>(|tx| {
        let budget_ms = remaining(deadline, operation)?.as_millis().max(1);
        sql_query(format!("SET LOCAL statement_timeout = {}", budget_ms)).execute(tx)?;
        sql_query(format!("SET LOCAL lock_timeout = {}", budget_ms)).execute(tx)?;

        let value = body(tx)?;

        remaining(deadline, operation)?;
        Ok(value)
    })
}

fn load_latest(conn: &mut PgConnection) -> RepositoryResult<Option<StatusEvent>> {
    let row = sede_statuses::table
        .order((sede_statuses::timestamp.desc(), sede_statuses::id.desc()))
        .select(StatusRow::as_select())
        .first::<StatusRow>(conn)
        .optional()?;
    Ok(row.map(StatusEvent::from))
}

fn insert_row(conn: &mut PgConnection, event: NewStatusEvent) -> RepositoryResult<StatusEvent> {
    let row = diesel::insert_into(sede_statuses::table)
        .values(NewStatusRow::from(event))
        .returning(StatusRow::as_returning())
        .get_result::<StatusRow>(conn)?;
    Ok(row.into())
}

#[async_trait]
impl LedgerRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn, _| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    async fn latest_event(&self) -> RepositoryResult<Option<StatusEvent>> {
        self.with_conn("latest_event", |conn, _| load_latest(conn))
            .await
    }

    async fn append_event(&self, event: NewStatusEvent) -> RepositoryResult<StatusEvent> {
        self.with_conn("append_event", move |conn, deadline| {
            write_within(conn, deadline, "append_event", |tx| insert_row(tx, event))
        })
        .await
    }

    async fn append_if_latest(
        &self,
        expected_latest: Option<EventId>,
        event: NewStatusEvent,
    ) -> RepositoryResult<AppendOutcome> {
        self.with_conn("append_if_latest", move |conn, deadline| {
            write_within(conn, deadline, "append_if_latest", |tx| {
                sql_query("SELECT pg_advisory_xact_lock($1)")
                    .bind::<BigInt, _>(LEDGER_LOCK_KEY)
                    .execute(tx)?;

                let current = load_latest(tx)?;
                if current.as_ref().map(|e| e.id) != expected_latest {
                    debug!(
                        "conditional append rejected: expected {:?}, found {:?}",
                        expected_latest,
                        current.as_ref().map(|e| e.id)
                    );
                    return Ok(AppendOutcome::Stale(current));
                }

                insert_row(tx, event).map(AppendOutcome::Appended)
            })
        })
        .await
    }

    async fn count_events(&self) -> RepositoryResult<i64> {
        self.with_conn("count_events", |conn, _| {
            Ok(sede_statuses::table.count().get_result::<i64>(conn)?)
        })
        .await
    }

    async fn events_since(&self, since: DateTime<Utc>) -> RepositoryResult<Vec<StatusEvent>> {
        self.with_conn("events_since", move |conn, _| {
            let rows = sede_statuses::table
                .filter(sede_statuses::timestamp.ge(since))
                .order((sede_statuses::timestamp.asc(), sede_statuses::id.asc()))
                .select(StatusRow::as_select())
                .load::<StatusRow>(conn)?;
            Ok(rows.into_iter().map(StatusEvent::from).collect())
        })
        .await
    }
}
