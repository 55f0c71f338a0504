//! Helper functions for handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// `{ "error": message }` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `{ "error": message, "details": details }` with the given status.
pub fn error_with_details(
    status: StatusCode,
    message: &str,
    details: impl std::fmt::Display,
) -> Response {
    (
        status,
        Json(json!({ "error": message, "details": details.to_string() })),
    )
        .into_response()
}

/// Trimmed, non-empty string field.
pub fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
