//! The message entity and its validated insert form.

use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Number of rows returned by a listing when the caller gives no limit.
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Rows inserted once into an empty store so a fresh deployment has something to show.
pub const EXAMPLE_MESSAGES: [&str; 5] = [
    "Hi! This is the first anonymous message.",
    "I really like this bot!",
    "I'd love to know who else is using this bot.",
    "Thank you for building such a useful tool!",
    "This is a test message to check that everything works.",
];

/// A stored message. Rows are never mutated after insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Store-assigned, strictly increasing; the only ordering key.
    pub id: i64,
    pub text: String,
    /// Opaque sender identity, present only for the privileged (bot) path.
    pub submitter_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A message that passed validation and is ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub text: String,
    pub submitter_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// Validates `text` and stamps the insert time.
    ///
    /// Absent and empty text are both rejected. Whitespace is kept as sent.
    pub fn new(text: Option<&str>, submitter_id: Option<&str>) -> Result<Self> {
        let text = match text {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(RelayError::Validation("Empty message".to_string())),
        };

        Ok(Self {
            text,
            submitter_id: submitter_id.map(str::to_string),
            created_at: Utc::now(),
        })
    }
}

/// Aggregate numbers reported by the privileged statistics endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageStats {
    pub total_messages: i64,
    pub last_24h_messages: i64,
    pub unique_users: i64,
    pub first_message_time: Option<DateTime<Utc>>,
    pub last_message_time: Option<DateTime<Utc>>,
}
