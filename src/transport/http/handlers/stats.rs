use crate::transport::http::handlers::common::{require_api_key, storage_error};
use crate::transport::http::types::{AppState, ErrorResponse, StatsResponse};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/stats",
    params(("X-API-Key" = String, Header, description = "Shared secret")),
    responses(
        (status = 200, description = "Aggregate statistics", body = StatsResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn stats_handler(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(rejection) = require_api_key(&state, &headers) {
        return rejection.into_response();
    }

    match state.messages.stats().await {
        Ok(stats) => (StatusCode::OK, Json(StatsResponse::from(stats))).into_response(),
        Err(e) => storage_error("failed to compute stats", e).into_response(),
    }
}
