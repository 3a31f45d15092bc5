//! FIFO retention: keep the store at or under a fixed number of rows.

use crate::error::Result;
use crate::storage::MessageStore;

/// Maximum number of rows the store may hold once a write completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_rows: u32,
}

impl RetentionPolicy {
    pub fn new(max_rows: u32) -> Self {
        Self { max_rows }
    }

    pub fn max_rows(&self) -> u32 {
        self.max_rows
    }

    /// Rows that must go for `count` to fit. Zero when already within the limit.
    pub fn overflow(&self, count: i64) -> i64 {
        (count - i64::from(self.max_rows)).max(0)
    }

    /// Deletes the oldest rows until the store holds at most `max_rows`.
    ///
    /// Callers must hold the store's write lock so the count and the delete
    /// observe the same row set.
    pub async fn enforce(&self, store: &dyn MessageStore) -> Result<u64> {
        let overflow = self.overflow(store.count().await?);
        if overflow == 0 {
            return Ok(0);
        }
        let deleted = store.delete_oldest(overflow).await?;
        tracing::debug!(overflow, deleted, max_rows = self.max_rows, "retention enforced");
        Ok(deleted)
    }
}
