use crate::transport::http::auth::API_KEY_HEADER;
use crate::transport::http::types::SubmitResponse;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;

/// What happened to a forwarded message, as far as the sender is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    Stored { message_id: Option<i64> },
    /// The relay answered 200 with `success: false`.
    Rejected(String),
    /// The relay answered with a non-200 status.
    HttpStatus(u16),
    /// No usable answer: connection failure, timeout, or an unreadable body.
    Failed(String),
}

impl RelayOutcome {
    /// Reply sent back to the chat.
    pub fn reply_text(&self) -> String {
        match self {
            RelayOutcome::Stored { .. } => "✅ Your message has been saved anonymously.".to_string(),
            RelayOutcome::Rejected(error) => format!("❌ Could not save your message: {}", error),
            RelayOutcome::HttpStatus(status) => format!("❌ The server returned an error: {}", status),
            RelayOutcome::Failed(_) => "❌ Something went wrong while saving your message.".to_string(),
        }
    }
}

/// Client for `POST /bot/messages`.
pub struct RelayClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl RelayClient {
    pub fn new(base_url: &str, api_key: SecretString) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot/messages", base_url.trim_end_matches('/')),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn submit(&self, text: &str, user_id: &str) -> RelayOutcome {
        let response = match self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(&json!({ "text": text, "user_id": user_id }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "relay request failed");
                return RelayOutcome::Failed(e.to_string());
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(status = status.as_u16(), "relay returned non-200 status");
            return RelayOutcome::HttpStatus(status.as_u16());
        }

        match response.json::<SubmitResponse>().await {
            Ok(body) if body.success => {
                tracing::info!(message_id = ?body.message_id, "message relayed");
                RelayOutcome::Stored {
                    message_id: body.message_id,
                }
            }
            Ok(body) => {
                let error = body.error.unwrap_or_else(|| "Unknown error".to_string());
                tracing::error!(error = %error, "relay rejected message");
                RelayOutcome::Rejected(error)
            }
            Err(e) => {
                tracing::error!(error = %e, "relay response was not understood");
                RelayOutcome::Failed(e.to_string())
            }
        }
    }
}
