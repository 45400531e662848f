//! Registration, login and account self-service.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::{Value, json};

use devcamper_auth::{Role, UserAccount, digest_token};
use devcamper_core::{Collection, Document, Filter, Resource, UserId};
use devcamper_infra::EmailMessage;

use crate::app::dto::{
    self, Fields, ForgotPasswordRequest, JsonBody, LoginRequest, ResetPasswordRequest,
    UpdatePasswordRequest,
};
use crate::app::errors::{ApiError, INVALID_CREDENTIALS};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::Session;
use crate::middleware::SESSION_COOKIE;

const USERS: Collection = Collection::Users;

/// Seconds the cleared cookie survives after logout.
const LOGOUT_COOKIE_SECS: i64 = 10;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/update", put(update_details))
        .route("/update-password", put(update_password))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", put(reset_password))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    if let Some(Value::String(role)) = body.get("role") {
        let role: Role = role.parse()?;
        if !role.is_self_assignable() {
            return Err(ApiError::bad_request(format!("Role `{role}` can not be self-assigned")));
        }
    }

    let account = UserAccount::from_input(body)?;
    let doc = services
        .store
        .insert(USERS, Document::new(account.to_fields()?, Utc::now()))
        .await?;
    tracing::info!(id = %doc.id(), role = %account.role, "user registered");
    session_response(&services, doc.id().into())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let (Some(email), Some(password)) = (body.email, body.password) else {
        return Err(ApiError::bad_request("Please provide an email and password"));
    };

    let Some(doc) = services
        .store
        .find_one(USERS, Filter::new().eq("email", email.as_str()))
        .await?
    else {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    };
    let account = UserAccount::from_document(&doc)?;
    if !account.matches_password(&password)? {
        tracing::info!(id = %doc.id(), "login rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }
    session_response(&services, doc.id().into())
}

/// Overwrite the session cookie; the token itself stays valid until expiry.
pub async fn logout(_session: Session) -> Result<Response, ApiError> {
    let cookie = format!("{SESSION_COOKIE}=none; HttpOnly; Path=/; Max-Age={LOGOUT_COOKIE_SECS}");
    let mut response = dto::data(StatusCode::OK, json!({}));
    response.headers_mut().insert(header::SET_COOKIE, header_value(&cookie)?);
    Ok(response)
}

pub async fn me(session: Session) -> Result<Response, ApiError> {
    Ok(dto::data(StatusCode::OK, dto::present(USERS, session.user)))
}

/// Only `name` and `email` can be changed here.
pub async fn update_details(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    let patch = dto::pick(body, &["name", "email"]);
    let account: UserAccount = common::patched(&session.user, patch)?;
    let doc = common::save_model(&services, session.user, &account).await?;
    Ok(dto::data(StatusCode::OK, dto::present(USERS, doc)))
}

pub async fn update_password(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    JsonBody(body): JsonBody<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    let (Some(current), Some(new)) = (body.current_password, body.new_password) else {
        return Err(ApiError::bad_request("Please provide the current and the new password"));
    };

    let mut account = session.account()?;
    if !account.matches_password(&current)? {
        return Err(ApiError::Unauthorized("Password is incorrect"));
    }
    account.set_password(&new)?;
    let doc = common::save_model(&services, session.user, &account).await?;
    session_response(&services, doc.id().into())
}

pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<ForgotPasswordRequest>,
) -> Result<Response, ApiError> {
    let email = body.email.unwrap_or_default();
    let doc = services
        .store
        .find_one(USERS, Filter::new().eq("email", email.as_str()))
        .await?
        .ok_or_else(|| ApiError::NoMatch("There is no user with that email".to_string()))?;

    let mut account = UserAccount::from_document(&doc)?;
    let token = account.begin_reset(Utc::now());
    let doc = common::save_model(&services, doc, &account).await?;
    let id = doc.id();

    let url = reset_url(&headers, &services.config.server.base_path, token.raw());
    let message = EmailMessage {
        to: email,
        subject: "Password reset token".to_string(),
        body: format!(
            "You are receiving this email because you (or someone else) has requested the reset of a password. \
             Please make a PUT request to: \n\n {url}"
        ),
    };

    if let Err(e) = services.mailer.send(message).await {
        // No mail went out, so the pending token must not stay usable.
        account.clear_reset();
        if let Err(save) = common::save_model(&services, doc, &account).await {
            tracing::error!(error = %save, "failed to clear reset token after mail failure");
        }
        return Err(e.into());
    }
    tracing::info!(%id, "password reset requested");
    Ok(dto::data(StatusCode::OK, "Email sent"))
}

pub async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Path(token): Path<String>,
    JsonBody(body): JsonBody<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let doc = services
        .store
        .find_one(USERS, Filter::new().eq("resetPasswordToken", digest_token(&token)))
        .await?
        .ok_or_else(|| ApiError::bad_request("Invalid token"))?;

    let mut account = UserAccount::from_document(&doc)?;
    if !account.reset_token_matches(&token, now) {
        return Err(ApiError::bad_request("Invalid token"));
    }
    account.set_password(body.password.as_deref().unwrap_or_default())?;
    let doc = common::save_model(&services, doc, &account).await?;
    tracing::info!(id = %doc.id(), "password reset");
    session_response(&services, doc.id().into())
}

/// `{ success, token }` plus the session cookie.
fn session_response(services: &AppServices, user: UserId) -> Result<Response, ApiError> {
    let token = services.jwt.issue(user, Utc::now())?;

    let max_age = services.config.auth.cookie_expire_days.saturating_mul(24 * 60 * 60);
    let mut cookie = format!("{SESSION_COOKIE}={token}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Lax");
    if services.config.is_production() {
        cookie.push_str("; Secure");
    }

    let mut response = (StatusCode::OK, Json(json!({ "success": true, "token": token }))).into_response();
    response.headers_mut().insert(header::SET_COOKIE, header_value(&cookie)?);
    Ok(response)
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(ApiError::internal)
}

/// `<scheme>://<host><base>/auth/reset-password/<token>`
fn reset_url(headers: &HeaderMap, base_path: &str, token: &str) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let base = base_path.trim_end_matches('/');
    format!("{scheme}://{host}{base}/auth/reset-password/{token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_url_uses_request_host_and_base_path() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("devcamper.io"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            reset_url(&headers, "/api/v1", "abc"),
            "https://devcamper.io/api/v1/auth/reset-password/abc"
        );
    }

    #[test]
    fn root_base_path_does_not_double_the_slash() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:5000"));
        assert_eq!(
            reset_url(&headers, "/", "abc"),
            "http://localhost:5000/auth/reset-password/abc"
        );
    }
}
