use crate::transport::http::handlers::common::{
    json_422, require_api_key, submit_outcome, submitter_json_to_string,
};
use crate::transport::http::types::{AppState, BotSubmitRequest, ErrorResponse, SubmitResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    post,
    path = "/bot/messages",
    request_body = BotSubmitRequest,
    params(("X-API-Key" = String, Header, description = "Shared secret")),
    responses(
        (status = 200, description = "Submission outcome; check `success`", body = SubmitResponse),
        (status = 401, description = "Missing or wrong API key", body = ErrorResponse),
        (status = 422, description = "Body is not JSON", body = SubmitResponse)
    )
)]
pub async fn bot_submit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Result<Json<BotSubmitRequest>, JsonRejection>,
) -> impl IntoResponse {
    if let Err(rejection) = require_api_key(&state, &headers) {
        return rejection.into_response();
    }

    let Json(request) = match request {
        Ok(r) => r,
        Err(e) => return json_422(e.body_text()).into_response(),
    };

    let submitter = request.user_id.as_ref().and_then(submitter_json_to_string);
    submit_outcome(
        state
            .messages
            .submit(request.text.as_deref(), submitter.as_deref())
            .await,
    )
    .into_response()
}
