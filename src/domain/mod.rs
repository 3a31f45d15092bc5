//! Domain types: messages and the retention rule applied to them.

pub mod message;
pub mod retention;

pub use message::{Message, MessageStats, NewMessage, DEFAULT_LIST_LIMIT, EXAMPLE_MESSAGES};
pub use retention::RetentionPolicy;
