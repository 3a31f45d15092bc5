//! Telegram front end: forwards chat messages to the relay.

use anon_relay::bot::{BotRunner, RelayClient, TelegramClient};
use anon_relay::infra::{init_tracing, BotSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = BotSettings::load()?;
    let relay_url = settings.relay_base_url();
    tracing::info!(relay = %relay_url, webapp = %settings.webapp_url, "starting bot");

    let telegram = TelegramClient::new(
        &settings.telegram_api_url,
        settings.bot_token,
        settings.poll_timeout_secs,
    )?;
    let relay = RelayClient::new(&relay_url, settings.api_key)?;
    let runner = BotRunner::new(telegram, relay, settings.webapp_url);

    runner
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    Ok(())
}
