//! The message service.
//!
//! This module sits between the HTTP handlers and the message store.
//! It is responsible for:
//! 1.  Validating submissions and writing them to the store.
//! 2.  Applying the retention limit in the same transaction as every write,
//!     under a single writer lock, so no write leaves more than `max_messages` rows.
//! 3.  Schema initialization and one-time seeding of an empty store.
//! 4.  Read-side queries: recent messages, counts and statistics.

use crate::domain::{Message, MessageStats, NewMessage, RetentionPolicy, EXAMPLE_MESSAGES};
use crate::error::Result;
use crate::storage::MessageStore;
use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Trailing window reported as `last_24h_messages`.
const STATS_WINDOW_HOURS: i64 = 24;

pub struct MessageService {
    store: Arc<dyn MessageStore>,
    retention: RetentionPolicy,
    /// Serializes writers so concurrent trims cannot over-delete.
    write_lock: Mutex<()>,
}

impl MessageService {
    pub fn new(store: Arc<dyn MessageStore>, max_messages: u32) -> Self {
        Self {
            store,
            retention: RetentionPolicy::new(max_messages),
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    pub fn max_messages(&self) -> u32 {
        self.retention.max_rows()
    }

    /// Creates the schema, trims rows left over from a larger limit, and,
    /// when `seed` is set and the table is empty, inserts the example
    /// messages. Returns the number of rows seeded.
    pub async fn initialize(&self, seed: bool) -> Result<usize> {
        self.store.init_schema().await?;

        let _guard = self.write_lock.lock().await;
        let trimmed = self.retention.enforce(self.store.as_ref()).await?;
        if trimmed > 0 {
            tracing::info!(trimmed, max_messages = self.max_messages(), "trimmed store to retention limit");
        }

        if !seed || self.store.count().await? != 0 {
            return Ok(0);
        }

        for text in EXAMPLE_MESSAGES {
            let message = NewMessage::new(Some(text), None)?;
            self.store.insert_and_trim(&message, &self.retention).await?;
        }

        tracing::info!(seeded = EXAMPLE_MESSAGES.len(), "seeded empty message store");
        Ok(EXAMPLE_MESSAGES.len())
    }

    /// Validates and stores a message, trimming the store back to the limit
    /// in the same transaction.
    ///
    /// The returned id belongs to a row that may already have been evicted
    /// when `max_messages` is zero.
    pub async fn submit(&self, text: Option<&str>, submitter_id: Option<&str>) -> Result<i64> {
        let message = NewMessage::new(text, submitter_id)?;

        let _guard = self.write_lock.lock().await;
        let outcome = self.store.insert_and_trim(&message, &self.retention).await?;

        tracing::info!(
            message_id = outcome.id,
            evicted = outcome.evicted,
            privileged = submitter_id.is_some(),
            "message stored"
        );
        Ok(outcome.id)
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<Message>> {
        self.store.list_recent(limit).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.store.count().await
    }

    pub async fn stats(&self) -> Result<MessageStats> {
        let total_messages = self.store.count().await?;
        let last_24h_messages = self
            .store
            .count_since(Duration::hours(STATS_WINDOW_HOURS))
            .await?;
        let unique_users = self.store.count_distinct_submitters().await?;
        let bounds = self.store.time_bounds().await?;

        Ok(MessageStats {
            total_messages,
            last_24h_messages,
            unique_users,
            first_message_time: bounds.map(|(first, _)| first),
            last_message_time: bounds.map(|(_, last)| last),
        })
    }
}
