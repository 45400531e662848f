use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, async_trait};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use devcamper_core::{Collection, Document};

use crate::app::errors::ApiError;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: Option<String>,
}

/// Free-form document fields as sent by the client.
pub type Fields = Map<String, Value>;

/// `Json<T>` whose rejections use the error envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
        }
    }
}

// -------------------------
// Response helpers
// -------------------------

/// `{ "success": true, "data": ... }`
pub fn data(status: StatusCode, data: impl serde::Serialize) -> Response {
    (status, Json(json!({ "success": true, "data": data }))).into_response()
}

/// `{ "success": true, "count": n, "data": [...] }` for unpaginated lists.
pub fn counted(docs: Vec<Document>) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "success": true, "count": docs.len(), "data": docs })),
    )
        .into_response()
}

/// A document as it may leave the server.
pub fn present(collection: Collection, mut doc: Document) -> Document {
    doc.redact(collection.hidden_fields());
    doc
}

/// Keep only the keys of `fields` named in `allowed`.
pub fn pick(fields: Fields, allowed: &[&str]) -> Fields {
    fields
        .into_iter()
        .filter(|(key, _)| allowed.contains(&key.as_str()))
        .collect()
}
