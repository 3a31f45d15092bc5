use crate::transport::http::handlers::{bot, health, messages, stats};
use crate::transport::http::types::{
    AppState, BotSubmitRequest, ErrorResponse, HealthResponse, MessageView, StatsResponse,
    SubmitRequest, SubmitResponse,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        messages::list_messages_handler,
        messages::submit_message_handler,
        bot::bot_submit_handler,
        stats::stats_handler
    ),
    components(schemas(
        MessageView,
        SubmitRequest,
        BotSubmitRequest,
        SubmitResponse,
        HealthResponse,
        StatsResponse,
        ErrorResponse
    ))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route(
            "/messages",
            get(messages::list_messages_handler).post(messages::submit_message_handler),
        )
        .route("/bot/messages", post(bot::bot_submit_handler))
        .route("/stats", get(stats::stats_handler))
        .with_state(app_state)
}
