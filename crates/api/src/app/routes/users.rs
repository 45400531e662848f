//! Admin-only user management.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::get,
};
use chrono::Utc;
use serde_json::{Value, json};

use devcamper_auth::UserAccount;
use devcamper_auth::user::PASSWORD_FIELD;
use devcamper_core::{Collection, Document, Resource};

use crate::app::dto::{self, Fields, JsonBody};
use crate::app::errors::ApiError;
use crate::app::routes::common::{self, QueryPairs, parse_id};
use crate::app::services::AppServices;
use crate::authz::{ADMINS, require_roles};
use crate::context::Session;

const USERS: Collection = Collection::Users;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    pairs: QueryPairs,
) -> Result<Response, ApiError> {
    require_roles(&session, ADMINS)?;
    common::list(&services, USERS, pairs, &[]).await
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_roles(&session, ADMINS)?;
    let doc = common::show(&services, USERS, parse_id(&id)?, &[]).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, ADMINS)?;
    let account = UserAccount::from_input(body)?;
    let doc = services
        .store
        .insert(USERS, Document::new(account.to_fields()?, Utc::now()))
        .await?;
    tracing::info!(id = %doc.id(), admin = %session.user_id(), "user created");
    Ok(dto::data(StatusCode::CREATED, dto::present(USERS, doc)))
}

/// A `password` in the body replaces the stored hash; everything else is
/// patched as usual.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
    JsonBody(mut body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, ADMINS)?;
    let doc = services.load(USERS, parse_id(&id)?).await?;

    let password = match body.remove(PASSWORD_FIELD) {
        Some(Value::String(p)) => Some(p),
        Some(_) => return Err(ApiError::bad_request("Password must be a string")),
        None => None,
    };
    let mut account: UserAccount = common::patched(&doc, body)?;
    if let Some(password) = password {
        account.set_password(&password)?;
    }

    let doc = common::save_model(&services, doc, &account).await?;
    Ok(dto::data(StatusCode::OK, dto::present(USERS, doc)))
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_roles(&session, ADMINS)?;
    let id = parse_id(&id)?;
    if !services.store.delete(USERS, id).await? {
        return Err(ApiError::not_found(USERS, id));
    }
    tracing::info!(%id, admin = %session.user_id(), "user deleted");
    Ok(dto::data(StatusCode::OK, json!({})))
}
