pub mod config;
pub mod telemetry;

pub use config::{BotSettings, Settings};
pub use telemetry::init_tracing;
