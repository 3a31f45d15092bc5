//! Telegram front end for the relay.
//!
//! Long-polls the Bot API, answers `/start` and `/read`, and forwards every
//! other text message to the relay's privileged submit endpoint.

pub mod relay_client;
pub mod runner;
pub mod telegram;

pub use relay_client::{RelayClient, RelayOutcome};
pub use runner::{parse_command, BotCommand, BotRunner};
pub use telegram::TelegramClient;
