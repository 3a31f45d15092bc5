use crate::bot::relay_client::RelayClient;
use crate::bot::telegram::{InlineKeyboardMarkup, SendMessage, TelegramClient, Update};
use std::future::Future;
use std::time::Duration;

pub const GREETING: &str =
    "👋 Hello! Send me anything you need to share and I will store it anonymously.\n\nIt will be heard.";
pub const READ_PROMPT: &str = "📩 You can read the messages here:";
pub const READ_BUTTON: &str = "📖 Open messages";

/// Pause after a failed poll before trying again.
const POLL_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Read,
    /// Anything else, forwarded verbatim.
    Relay(String),
}

/// Classifies a text message. Commands may carry a `@botname` suffix and
/// trailing arguments; unknown commands are relayed like ordinary text.
pub fn parse_command(text: &str) -> BotCommand {
    if let Some(rest) = text.strip_prefix('/') {
        let word = rest.split_whitespace().next().unwrap_or("");
        let name = word.split('@').next().unwrap_or("");
        match name {
            "start" => return BotCommand::Start,
            "read" => return BotCommand::Read,
            _ => {}
        }
    }
    BotCommand::Relay(text.to_string())
}

pub struct BotRunner {
    telegram: TelegramClient,
    relay: RelayClient,
    webapp_url: String,
}

impl BotRunner {
    pub fn new(telegram: TelegramClient, relay: RelayClient, webapp_url: String) -> Self {
        Self {
            telegram,
            relay,
            webapp_url,
        }
    }

    /// Handles one update. Non-text updates are skipped.
    pub async fn handle_update(&self, update: &Update) -> anyhow::Result<()> {
        let Some(message) = &update.message else {
            return Ok(());
        };
        let Some(text) = &message.text else {
            tracing::debug!(update_id = update.update_id, "ignoring non-text message");
            return Ok(());
        };
        let chat_id = message.chat.id;
        let sender = message.from.as_ref().map(|u| u.id).unwrap_or(chat_id);

        let reply = match parse_command(text) {
            BotCommand::Start => {
                tracing::info!(sender, "received /start");
                SendMessage {
                    chat_id,
                    text: GREETING.to_string(),
                    reply_markup: None,
                }
            }
            BotCommand::Read => {
                tracing::info!(sender, "received /read");
                SendMessage {
                    chat_id,
                    text: READ_PROMPT.to_string(),
                    reply_markup: Some(InlineKeyboardMarkup::web_app_button(
                        READ_BUTTON,
                        &self.webapp_url,
                    )),
                }
            }
            BotCommand::Relay(text) => {
                tracing::info!(sender, chars = text.chars().count(), "relaying message");
                let outcome = self.relay.submit(&text, &sender.to_string()).await;
                SendMessage {
                    chat_id,
                    text: outcome.reply_text(),
                    reply_markup: None,
                }
            }
        };

        self.telegram.send_message(&reply).await
    }

    /// Fetches one batch of updates and handles them in order, advancing
    /// `offset` past each. Returns the number of updates seen.
    pub async fn poll_once(&self, offset: &mut i64) -> anyhow::Result<usize> {
        let updates = self.telegram.get_updates(*offset).await?;
        for update in &updates {
            *offset = (*offset).max(update.update_id + 1);
            if let Err(e) = self.handle_update(update).await {
                tracing::warn!(update_id = update.update_id, error = %e, "failed to handle update");
            }
        }
        Ok(updates.len())
    }

    /// Polls until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut offset = 0;
        tracing::info!("bot polling started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                polled = self.poll_once(&mut offset) => {
                    if let Err(e) = polled {
                        tracing::warn!(error = %e, backoff_secs = POLL_BACKOFF.as_secs(), "polling failed");
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = tokio::time::sleep(POLL_BACKOFF) => {}
                        }
                    }
                }
            }
        }

        tracing::info!("bot polling stopped");
    }
}
