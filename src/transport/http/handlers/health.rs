use crate::transport::http::types::{AppState, HealthResponse};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "`status` is `ok` with counts, or `error` when the store is unreachable", body = HealthResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.messages.count().await {
        Ok(count) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                message_count: Some(count),
                max_messages: Some(state.messages.max_messages()),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check could not read the store");
            (
                StatusCode::OK,
                Json(HealthResponse {
                    status: "error".to_string(),
                    message_count: None,
                    max_messages: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}
