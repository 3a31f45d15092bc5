//! Error type shared by the store, the message service and the bot front end.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// Rejected input, e.g. an empty message text.
    #[error("validation error: {0}")]
    Validation(String),

    /// Shared-secret mismatch on a privileged path.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any failure reported by the underlying database.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// A stored timestamp that does not parse back.
    #[error("invalid stored timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Malformed configuration (bad database URL and similar).
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;
