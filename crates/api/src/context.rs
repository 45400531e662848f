use std::sync::Arc;

use axum::{
    async_trait,
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;

use devcamper_auth::{JwtValidator, Principal, UserAccount};
use devcamper_core::{Collection, Document, Resource, UserId};

use crate::app::errors::{ApiError, NOT_AUTHORIZED};
use crate::app::services::AppServices;
use crate::middleware::extract_token;

/// The caller of a protected route.
///
/// The token only names the user; the account itself is re-loaded on every
/// request so role changes and deletions apply immediately.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal: Principal,
    pub user: Document,
}

impl Session {
    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn account(&self) -> Result<UserAccount, ApiError> {
        Ok(UserAccount::from_document(&self.user)?)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(services) = Extension::<Arc<AppServices>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e.body_text()))?;

        let token = extract_token(&parts.headers).ok_or(ApiError::Unauthorized(NOT_AUTHORIZED))?;
        let claims = services
            .jwt
            .validate(token, Utc::now())
            .map_err(|_| ApiError::Unauthorized(NOT_AUTHORIZED))?;

        let user = services
            .store
            .get(Collection::Users, claims.sub.into())
            .await?
            .ok_or(ApiError::Unauthorized(NOT_AUTHORIZED))?;
        let account = UserAccount::from_document(&user)?;

        Ok(Session {
            principal: Principal::new(claims.sub, account.role),
            user,
        })
    }
}
