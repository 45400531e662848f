use axum::{http::StatusCode, response::Response};
use serde_json::json;

use crate::app::dto;
use crate::app::errors::json_error;

/// Liveness probe.
pub async fn health() -> Response {
    dto::data(StatusCode::OK, json!({ "status": "ok" }))
}

/// Any route that did not match.
pub async fn fallback() -> Response {
    json_error(StatusCode::NOT_FOUND, "Route not found")
}
