//! Persistent message storage.
//!
//! The relay keeps a single `messages` table. Two backends implement the same
//! contract: SQLite (the default, a local file) and PostgreSQL (selected by a
//! `postgres://` URL). Both assign strictly increasing ids that are never
//! reused after deletion.

use crate::domain::{Message, NewMessage, RetentionPolicy};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresMessageStore;
pub use sqlite::SqliteMessageStore;

/// Result of an insert that was trimmed back to the retention limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertOutcome {
    pub id: i64,
    pub evicted: u64,
}

/// Contract for any message backend.
///
/// Implementations do not serialize writers themselves; the message service
/// holds a write lock around every `insert_and_trim`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Creates the `messages` table if missing and upgrades legacy layouts.
    /// Safe to call on every startup.
    async fn init_schema(&self) -> Result<()>;

    /// Inserts a row and deletes the overflow under `policy` in one
    /// transaction. Either both are committed or neither is, so a cancelled
    /// or failed call never leaves the store above the limit.
    async fn insert_and_trim(
        &self,
        message: &NewMessage,
        policy: &RetentionPolicy,
    ) -> Result<InsertOutcome>;

    /// Up to `limit` rows, newest (highest id) first.
    async fn list_recent(&self, limit: u32) -> Result<Vec<Message>>;

    /// Total number of rows.
    async fn count(&self) -> Result<i64>;

    /// Rows created within the trailing `window`.
    async fn count_since(&self, window: Duration) -> Result<i64>;

    /// Distinct non-null submitter ids.
    async fn count_distinct_submitters(&self) -> Result<i64>;

    /// Earliest and latest `created_at`, or `None` for an empty table.
    async fn time_bounds(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>>;

    /// Deletes the `n` rows with the smallest ids and returns how many went.
    async fn delete_oldest(&self, n: i64) -> Result<u64>;

    /// Round-trips a trivial query.
    async fn ping(&self) -> Result<()>;
}

/// Opens the backend named by `database_url` without touching the database yet.
///
/// `postgres://` and `postgresql://` URLs select PostgreSQL. Anything else is
/// SQLite: either a `sqlite:` URL or a filesystem path (a directory gets a
/// `messages.db` inside it). Connections are established on first use, so an
/// unreachable database surfaces as a storage error later rather than here.
pub fn connect(database_url: &str) -> Result<Arc<dyn MessageStore>> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        tracing::info!("using PostgreSQL message store");
        return Ok(Arc::new(PostgresMessageStore::connect_lazy(database_url)?));
    }
    tracing::info!(location = database_url, "using SQLite message store");
    Ok(Arc::new(SqliteMessageStore::connect_lazy(database_url)?))
}
