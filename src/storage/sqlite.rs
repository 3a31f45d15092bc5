//! SQLite message store.
//!
//! `created_at` is kept as fixed-width RFC 3339 UTC text
//! (`YYYY-MM-DDTHH:MM:SS.mmmZ`), the same shape the column default produces,
//! so comparing the text compares the instants.

use crate::domain::{Message, NewMessage, RetentionPolicy};
use crate::error::{RelayError, Result};
use crate::storage::{InsertOutcome, MessageStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::PathBuf;
use std::str::FromStr;

/// File created inside `DATABASE_URL` when it names a directory.
pub const DEFAULT_FILE_NAME: &str = "messages.db";

const INSERT_MESSAGE: &str = "INSERT INTO messages (text, submitter_id, created_at) VALUES (?, ?, ?)";
const DELETE_OLDEST: &str =
    "DELETE FROM messages WHERE id IN (SELECT id FROM messages ORDER BY id ASC LIMIT ?)";

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// Builds a lazily connecting pool for a `sqlite:` URL or a filesystem path.
    ///
    /// The database file (and its parent directory) is created if absent.
    pub fn connect_lazy(location: &str) -> Result<Self> {
        let in_memory = location.contains(":memory:") || location.contains("mode=memory");

        let base = if location.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(location)
                .map_err(|e| RelayError::Config(format!("invalid DATABASE_URL: {}", e)))?
        } else {
            let mut path = PathBuf::from(location);
            if path.is_dir() {
                path.push(DEFAULT_FILE_NAME);
            }
            SqliteConnectOptions::new().filename(path)
        };
        let options = base.create_if_missing(true);

        if !in_memory {
            if let Some(parent) = options.clone().get_filename().parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
                }
            }
        }

        // An in-memory database lives only as long as its connection, so keep
        // exactly one and never recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        Ok(Self {
            pool: pool_options.connect_lazy_with(options),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn decode_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| RelayError::InvalidTimestamp {
            value: value.to_string(),
            source,
        })
}

fn message_from_row(row: &SqliteRow) -> Result<Message> {
    // Upgraded legacy tables allow NULL here; such rows sort as the epoch.
    let created_at: Option<String> = row.try_get("created_at")?;
    Ok(Message {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        submitter_id: row.try_get("submitter_id")?,
        created_at: match created_at {
            Some(value) => decode_ts(&value)?,
            None => DateTime::<Utc>::default(),
        },
    })
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                submitter_id TEXT,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Tables from older deployments only have (id, text).
        let columns: Vec<String> = sqlx::query("PRAGMA table_info(messages)")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<std::result::Result<_, _>>()?;

        if !columns.iter().any(|c| c == "submitter_id") {
            sqlx::query("ALTER TABLE messages ADD COLUMN submitter_id TEXT")
                .execute(&self.pool)
                .await?;
            tracing::info!("added submitter_id column to legacy messages table");
        }

        if !columns.iter().any(|c| c == "created_at") {
            // SQLite refuses a non-constant default on ALTER, so backfill instead.
            sqlx::query("ALTER TABLE messages ADD COLUMN created_at TEXT")
                .execute(&self.pool)
                .await?;
            let backfilled = sqlx::query("UPDATE messages SET created_at = ? WHERE created_at IS NULL")
                .bind(encode_ts(Utc::now()))
                .execute(&self.pool)
                .await?
                .rows_affected();
            tracing::info!(backfilled, "added created_at column to legacy messages table");
        }

        // Writers that predate the column leave it NULL; stamp those rows.
        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS messages_created_at_default
            AFTER INSERT ON messages
            WHEN NEW.created_at IS NULL
            BEGIN
                UPDATE messages
                SET created_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                WHERE id = NEW.id;
            END
            "#,
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
        // Dropping `tx` before commit rolls the insert back.
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(INSERT_MESSAGE)
            .bind(&message.text)
            .bind(&message.submitter_id)
            .bind(encode_ts(message.created_at))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

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
        sqlx::query("SELECT id, text, submitter_id, created_at FROM messages ORDER BY id DESC LIMIT ?")
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
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE created_at >= ?")
            .bind(encode_ts(Utc::now() - window))
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
        let first: Option<String> = row.try_get("first")?;
        let last: Option<String> = row.try_get("last")?;
        match (first, last) {
            (Some(first), Some(last)) => Ok(Some((decode_ts(&first)?, decode_ts(&last)?))),
            _ => Ok(None),
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn memory_store() -> SqliteMessageStore {
        let store = SqliteMessageStore::connect_lazy("sqlite::memory:").unwrap();
        store.init_schema().await.unwrap();
        store
    }

    async fn insert_text(store: &SqliteMessageStore, text: &str, submitter: Option<&str>) -> i64 {
        let msg = NewMessage::new(Some(text), submitter).unwrap();
        store
            .insert_and_trim(&msg, &RetentionPolicy::new(u32::MAX))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn ids_increase_and_list_is_newest_first() {
        let store = memory_store().await;
        let a = insert_text(&store, "a", None).await;
        let b = insert_text(&store, "b", None).await;
        let c = insert_text(&store, "c", Some("7")).await;
        assert!(a < b && b < c);

        let recent = store.list_recent(2).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![c, b]);
        assert_eq!(recent[0].submitter_id.as_deref(), Some("7"));

        assert_eq!(store.list_recent(100).await.unwrap().len(), 3);
        assert!(store.list_recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_oldest_is_fifo() {
        let store = memory_store().await;
        for text in ["1", "2", "3"] {
            insert_text(&store, text, None).await;
        }

        assert_eq!(store.delete_oldest(1).await.unwrap(), 1);

        let texts: Vec<String> = store
            .list_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["3", "2"]);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_deletion() {
        let store = memory_store().await;
        let first = insert_text(&store, "x", None).await;
        store.delete_oldest(1).await.unwrap();
        let second = insert_text(&store, "y", None).await;
        assert!(second > first);
    }

    #[tokio::test]
    async fn counts_submitters_and_time_window() {
        let store = memory_store().await;
        assert_eq!(store.time_bounds().await.unwrap(), None);

        insert_text(&store, "anon", None).await;
        insert_text(&store, "one", Some("1")).await;
        insert_text(&store, "one again", Some("1")).await;
        insert_text(&store, "two", Some("2")).await;

        // A row older than the trailing window.
        sqlx::query("INSERT INTO messages (text, created_at) VALUES (?, ?)")
            .bind("old")
            .bind(encode_ts(Utc::now() - Duration::days(3)))
            .execute(store.pool())
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 5);
        assert_eq!(store.count_since(Duration::hours(24)).await.unwrap(), 4);
        assert_eq!(store.count_distinct_submitters().await.unwrap(), 2);

        let (first, last) = store.time_bounds().await.unwrap().unwrap();
        assert!(first < last);
    }

    #[tokio::test]
    async fn column_default_timestamp_decodes() {
        let store = memory_store().await;
        sqlx::query("INSERT INTO messages (text) VALUES ('defaulted')")
            .execute(store.pool())
            .await
            .unwrap();
        let msg = store.list_recent(1).await.unwrap().remove(0);
        assert!(Utc::now() - msg.created_at < Duration::minutes(1));
    }

    #[tokio::test]
    async fn upgrades_legacy_table() {
        let store = SqliteMessageStore::connect_lazy("sqlite::memory:").unwrap();
        sqlx::query("CREATE TABLE messages (id INTEGER PRIMARY KEY AUTOINCREMENT, text TEXT NOT NULL)")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO messages (text) VALUES ('from the old days')")
            .execute(store.pool())
            .await
            .unwrap();

        store.init_schema().await.unwrap();
        store.init_schema().await.unwrap();

        let msg = store.list_recent(1).await.unwrap().remove(0);
        assert_eq!(msg.text, "from the old days");
        assert_eq!(msg.submitter_id, None);
        assert_eq!(store.count_since(Duration::hours(1)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn legacy_writers_without_timestamp_stay_listable() {
        let store = SqliteMessageStore::connect_lazy("sqlite::memory:").unwrap();
        sqlx::query("CREATE TABLE messages (id INTEGER PRIMARY KEY AUTOINCREMENT, text TEXT NOT NULL)")
            .execute(store.pool())
            .await
            .unwrap();
        store.init_schema().await.unwrap();

        // An old writer that only knows about `text`.
        sqlx::query("INSERT INTO messages (text) VALUES ('old writer')")
            .execute(store.pool())
            .await
            .unwrap();
        let stamped = store.list_recent(1).await.unwrap().remove(0);
        assert_eq!(stamped.text, "old writer");
        assert!(Utc::now() - stamped.created_at < Duration::minutes(1));

        // A NULL that slipped in some other way still decodes.
        sqlx::query("UPDATE messages SET created_at = NULL")
            .execute(store.pool())
            .await
            .unwrap();
        let listed = store.list_recent(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].created_at, DateTime::<Utc>::default());
    }

    #[tokio::test]
    async fn insert_and_trim_evicts_oldest_in_one_step() {
        let store = memory_store().await;
        let policy = RetentionPolicy::new(2);
        let mut outcomes = Vec::new();
        for text in ["a", "b", "c"] {
            let msg = NewMessage::new(Some(text), None).unwrap();
            outcomes.push(store.insert_and_trim(&msg, &policy).await.unwrap());
        }
        assert_eq!(outcomes[0].evicted, 0);
        assert_eq!(outcomes[1].evicted, 0);
        assert_eq!(outcomes[2].evicted, 1);

        let kept: Vec<i64> = store.list_recent(10).await.unwrap().iter().map(|m| m.id).collect();
        assert_eq!(kept, vec![outcomes[2].id, outcomes[1].id]);
    }

    #[tokio::test]
    async fn failed_trim_rolls_back_the_insert() {
        let store = memory_store().await;
        let policy = RetentionPolicy::new(1);
        insert_text(&store, "first", None).await;
        sqlx::query(
            "CREATE TRIGGER refuse_delete BEFORE DELETE ON messages
             BEGIN SELECT RAISE(ABORT, 'delete refused'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let msg = NewMessage::new(Some("second"), None).unwrap();
        let err = store.insert_and_trim(&msg, &policy).await.unwrap_err();
        assert!(matches!(err, RelayError::Storage(_)));

        let texts: Vec<String> = store
            .list_recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["first"]);
    }

    #[tokio::test]
    async fn directory_location_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let store = SqliteMessageStore::connect_lazy(dir.path().to_str().unwrap()).unwrap();
        store.init_schema().await.unwrap();
        assert!(dir.path().join(DEFAULT_FILE_NAME).exists());
    }
}
