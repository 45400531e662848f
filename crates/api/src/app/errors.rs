use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use devcamper_auth::{AuthError, AuthzError};
use devcamper_core::{Collection, DomainError, QueryError};
use devcamper_infra::geocoder::GeocodeError;
use devcamper_infra::{MailError, StoreError, UploadError};

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Every failure a handler can surface, mapped onto one status + message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{} not found with id of {id}", .collection.label())]
    NotFound { collection: Collection, id: String },

    /// Nothing matched a lookup that is not by id.
    #[error("{0}")]
    NoMatch(String),

    /// A path id that is not a valid identifier.
    #[error("Resource not found with id of {0}")]
    BadCast(String),

    #[error("{}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Duplicate field value entered")]
    Duplicate,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("Too many requests, please try again later")]
    TooManyRequests,

    /// Logged in full; the client only sees `message`.
    #[error("{message}")]
    Internal { message: &'static str, detail: String },
}

impl ApiError {
    pub fn not_found(collection: Collection, id: impl ToString) -> Self {
        Self::NotFound {
            collection,
            id: id.to_string(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(detail: impl ToString) -> Self {
        Self::Internal {
            message: "Server Error",
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::NoMatch(_) | ApiError::BadCast(_) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Validation(_) | ApiError::Duplicate | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal { detail, .. } => tracing::error!(%detail, "request failed"),
            other => tracing::debug!(status = status.as_u16(), error = %other, "request rejected"),
        }
        json_error(status, self.to_string())
    }
}

/// `{ "success": false, "error": message }`
pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(messages) => ApiError::Validation(messages),
            DomainError::InvalidId(raw) => ApiError::BadCast(raw),
            DomainError::Conflict(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { .. } => ApiError::Duplicate,
            StoreError::MissingParent { parent, .. } => ApiError::not_found(Collection::Bootcamps, parent),
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid(domain) => domain.into(),
            AuthError::UnknownRole(_) => ApiError::BadRequest(err.to_string()),
            other => ApiError::internal(other),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => ApiError::internal(e),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

impl From<GeocodeError> for ApiError {
    fn from(err: GeocodeError) -> Self {
        ApiError::internal(err)
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        ApiError::Internal {
            message: "Email could not be sent",
            detail: err.to_string(),
        }
    }
}
