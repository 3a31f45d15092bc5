use crate::error::RelayError;
use crate::transport::http::auth::API_KEY_HEADER;
use crate::transport::http::types::{AppState, ErrorResponse, SubmitResponse};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::Value as JsonValue;

/// Fails with 401 unless the request carries the configured shared secret.
/// Runs before any store access.
pub fn require_api_key(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if state.api_key.matches(presented) {
        return Ok(());
    }

    let err = if !state.api_key.is_configured() {
        RelayError::Unauthorized("API_KEY is not configured".to_string())
    } else if presented.is_none() {
        RelayError::Unauthorized(format!("missing {} header", API_KEY_HEADER))
    } else {
        RelayError::Unauthorized("key mismatch".to_string())
    };
    tracing::warn!(error = %err, "privileged request rejected");
    Err((
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Invalid API key".to_string(),
        }),
    ))
}

/// Accepts a string or an integer identity; anything else is dropped.
pub fn submitter_json_to_string(id: &JsonValue) -> Option<String> {
    if let Some(s) = id.as_str() {
        return Some(s.to_string());
    }
    if let Some(i) = id.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = id.as_u64() {
        return Some(u.to_string());
    }
    None
}

/// Maps the result of a submit onto the response body. Both validation and
/// storage failures are reported at 200 with `success: false`.
pub fn submit_outcome(result: Result<i64, RelayError>) -> (StatusCode, Json<SubmitResponse>) {
    match result {
        Ok(id) => (StatusCode::OK, Json(SubmitResponse::stored(id))),
        Err(RelayError::Validation(msg)) => (StatusCode::OK, Json(SubmitResponse::failed(msg))),
        Err(e) => {
            tracing::error!(error = %e, "failed to store message");
            (StatusCode::OK, Json(SubmitResponse::failed(e.to_string())))
        }
    }
}

/// 422 for a body that is not the expected JSON document.
pub fn json_422(err: impl std::fmt::Display) -> (StatusCode, Json<SubmitResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(SubmitResponse::failed(format!("Invalid JSON body: {}", err))),
    )
}

/// 500 for read paths whose store query failed.
pub fn storage_error(context: &str, err: RelayError) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %err, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
