use crate::app::MessageService;
use crate::domain::{Message, MessageStats, DEFAULT_LIST_LIMIT};
use crate::transport::http::auth::SharedSecret;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<MessageService>,
    pub api_key: Arc<SharedSecret>,
}

impl AppState {
    pub fn new(messages: Arc<MessageService>, api_key: SharedSecret) -> Self {
        Self {
            messages,
            api_key: Arc::new(api_key),
        }
    }
}

fn default_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMessagesQuery {
    /// Maximum number of messages to return, newest first.
    #[serde(default = "default_limit")]
    #[param(default = 10, minimum = 0)]
    pub limit: u32,
}

/// Public view of a message: no id, no submitter.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageView {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Message> for MessageView {
    fn from(message: Message) -> Self {
        Self {
            text: message.text,
            timestamp: message.created_at,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SubmitRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct BotSubmitRequest {
    #[serde(default)]
    pub text: Option<String>,
    /// Sender identity. Numbers are accepted and stored as their decimal text.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub user_id: Option<JsonValue>,
}

/// Result of a submit call. Validation and storage failures are reported
/// here with `success: false` at HTTP 200.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn stored(message_id: i64) -> Self {
        Self {
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `error` when the store could not be read.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct StatsResponse {
    pub total_messages: i64,
    pub last_24h_messages: i64,
    pub unique_users: i64,
    pub first_message_time: Option<DateTime<Utc>>,
    pub last_message_time: Option<DateTime<Utc>>,
}

impl From<MessageStats> for StatsResponse {
    fn from(stats: MessageStats) -> Self {
        Self {
            total_messages: stats.total_messages,
            last_24h_messages: stats.last_24h_messages,
            unique_users: stats.unique_users,
            first_message_time: stats.first_message_time,
            last_message_time: stats.last_message_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
