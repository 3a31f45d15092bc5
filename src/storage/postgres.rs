//! PostgreSQL message store, selected by a `postgres://` `DATABASE_URL`.

use crate::domain::{Message, NewMessage, RetentionPolicy};
use crate::error::{RelayError, Result};
use crate::storage::{InsertOutcome, MessageStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::str::FromStr;

// The cast keeps decoding uniform for legacy SERIAL (int4) ids.
const INSERT_MESSAGE: &str = "INSERT INTO messages (text, submitter_id, created_at) VALUES ($1, $2, $3)
     RETURNING id::BIGINT";
const DELETE_OLDEST: &str =
    "DELETE FROM messages WHERE id IN (SELECT id FROM messages ORDER BY id ASC LIMIT $1)";

/// A message store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parses the URL now; connections are opened on first use.
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let options = PgConnectOptions::from_str(database_url)
            .map_err(|e| RelayError::Config(format!("invalid DATABASE_URL: {}", e)))?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy_with(options);
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn message_from_row(row: &PgRow) -> Result<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        submitter_id: row.try_get("submitter_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id BIGSERIAL PRIMARY KEY,
                text TEXT NOT NULL,
                submitter_id TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;

        // Older deployments created (id SERIAL, text) only.
        sqlx::query("ALTER TABLE messages ADD COLUMN IF NOT EXISTS submitter_id TEXT")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "ALTER TABLE messages ADD COLUMN IF NOT EXISTS created_at TIMESTAMPTZ NOT NULL DEFAULT now()",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_and_trim(
        &self,
        message: &NewMessage,
        policy: &RetentionPolicy,
    ) -> Result<InsertOutcome> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(INSERT_MESSAGE)
            .bind(&message.text)
            .bind(&message.submitter_id)
            .bind(message.created_at)
            .fetch_one(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&mut *tx)
            .await?;
        let overflow = policy.overflow(count);
        let evicted = if overflow > 0 {
            sqlx::query(DELETE_OLDEST)
                .bind(overflow)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };

        tx.commit().await?;
        Ok(InsertOutcome { id, evicted })
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Message>> {
        sqlx::query(
            "SELECT id::BIGINT AS id, text, submitter_id, created_at
             FROM messages ORDER BY id DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(message_from_row)
        .collect()
    }

    async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_since(&self, window: Duration) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE created_at >= $1")
            .bind(Utc::now() - window)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_distinct_submitters(&self) -> Result<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(DISTINCT submitter_id) FROM messages")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn time_bounds(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let row = sqlx::query("SELECT MIN(created_at) AS first, MAX(created_at) AS last FROM messages")
            .fetch_one(&self.pool)
            .await?;
        let first: Option<DateTime<Utc>> = row.try_get("first")?;
        let last: Option<DateTime<Utc>> = row.try_get("last")?;
        Ok(first.zip(last))
    }

    async fn delete_oldest(&self, n: i64) -> Result<u64> {
        let deleted = sqlx::query(DELETE_OLDEST)
            .bind(n)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
