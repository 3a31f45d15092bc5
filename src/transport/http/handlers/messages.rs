use crate::transport::http::handlers::common::{json_422, storage_error, submit_outcome};
use crate::transport::http::types::{
    AppState, ErrorResponse, ListMessagesQuery, MessageView, SubmitRequest, SubmitResponse,
};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/messages",
    params(ListMessagesQuery),
    responses(
        (status = 200, description = "Most recent messages, newest first", body = [MessageView]),
        (status = 400, description = "Malformed limit", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn list_messages_handler(
    State(state): State<AppState>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid query: {}", e.body_text()),
                }),
            )
                .into_response()
        }
    };

    match state.messages.list_recent(query.limit).await {
        Ok(messages) => {
            let views: Vec<MessageView> = messages.into_iter().map(MessageView::from).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => storage_error("failed to list messages", e).into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/messages",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Submission outcome; check `success`", body = SubmitResponse),
        (status = 422, description = "Body is not JSON", body = SubmitResponse)
    )
)]
pub async fn submit_message_handler(
    State(state): State<AppState>,
    request: Result<Json<SubmitRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(r) => r,
        Err(e) => return json_422(e.body_text()).into_response(),
    };

    submit_outcome(state.messages.submit(request.text.as_deref(), None).await).into_response()
}
