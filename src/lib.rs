pub mod app;
pub mod bot;
pub mod domain;
pub mod error;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{LivenessPinger, MessageService};
pub use error::{RelayError, Result};
pub use infra::{BotSettings, Settings};
pub use storage::MessageStore;
