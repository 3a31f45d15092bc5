//! Centralized configuration (environment variables + defaults).
//!
//! Values come from the process environment, optionally primed from a `.env`
//! file. Variable names are the upper-case form of the field names
//! (`MAX_MESSAGES` → `max_messages`).

use config::{Config, ConfigError, Environment, Source};
use secrecy::SecretString;
use serde::Deserialize;

/// Settings for the HTTP service.
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// `sqlite:` / `postgres://` URL, or a path to a SQLite file or directory.
    pub database_url: String,
    /// Shared secret expected in `X-API-Key`. Privileged endpoints reject
    /// every request while this is unset.
    pub api_key: Option<SecretString>,
    /// Retention maximum; the oldest rows are evicted beyond it.
    pub max_messages: u32,
    /// Externally reachable base URL, used by the liveness pinger.
    pub webapp_url: Option<String>,
    pub ping_enabled: bool,
    pub ping_interval_secs: u64,
    pub ping_initial_delay_secs: u64,
    /// Insert example rows when the store starts empty.
    pub seed_examples: bool,
}

impl Settings {
    /// Loads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_source(Environment::default())
    }

    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("database_url", "sqlite://messages.db")?
            .set_default("max_messages", 50)?
            .set_default("ping_enabled", true)?
            .set_default("ping_interval_secs", 600)?
            .set_default("ping_initial_delay_secs", 30)?
            .set_default("seed_examples", true)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL the service is reachable at from the outside, falling back
    /// to loopback on the listening port.
    pub fn public_base_url(&self) -> String {
        match &self.webapp_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => format!("http://127.0.0.1:{}", self.port),
        }
    }
}

/// Settings for the Telegram front end.
#[derive(Debug, Deserialize)]
pub struct BotSettings {
    pub bot_token: SecretString,
    /// Must match the relay service's `API_KEY`.
    pub api_key: SecretString,
    /// Web app opened by the `/read` button.
    pub webapp_url: String,
    /// Relay service base URL; defaults to `webapp_url`.
    pub relay_url: Option<String>,
    pub telegram_api_url: String,
    /// Server-side long-poll timeout for `getUpdates`.
    pub poll_timeout_secs: u64,
}

impl BotSettings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_source(Environment::default())
    }

    pub fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .set_default("telegram_api_url", "https://api.telegram.org")?
            .set_default("poll_timeout_secs", 30)?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn relay_base_url(&self) -> String {
        self.relay_url
            .as_deref()
            .unwrap_or(&self.webapp_url)
            .trim_end_matches('/')
            .to_string()
    }
}
