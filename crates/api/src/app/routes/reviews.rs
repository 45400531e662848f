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

use devcamper_core::document::OWNER_FIELD;
use devcamper_core::model::Review;
use devcamper_core::{Collection, Document, Expand, Resource};

use crate::app::dto::{self, Fields, JsonBody};
use crate::app::errors::ApiError;
use crate::app::routes::bootcamps::load_parent;
use crate::app::routes::common::{self, QueryPairs, parse_id};
use crate::app::services::AppServices;
use crate::authz::{REVIEWERS, authorize_change, require_roles};
use crate::context::Session;

const REVIEWS: Collection = Collection::Reviews;
const BOOTCAMP_FIELD: &str = "bootcamp";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/:id", get(get_review).put(update_review).delete(delete_review))
}

pub async fn list_reviews(
    Extension(services): Extension<Arc<AppServices>>,
    pairs: QueryPairs,
) -> Result<Response, ApiError> {
    common::list(&services, REVIEWS, pairs, &[Expand::BOOTCAMP_SUMMARY]).await
}

pub async fn list_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    Path(bootcamp): Path<String>,
) -> Result<Response, ApiError> {
    common::list_children(&services, REVIEWS, parse_id(&bootcamp)?, &[]).await
}

pub async fn get_review(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = common::show(&services, REVIEWS, parse_id(&id)?, &[Expand::BOOTCAMP_SUMMARY]).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn create_review(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    let bootcamp = body
        .get(BOOTCAMP_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation(vec!["Review must belong to a bootcamp".to_string()]))?
        .to_string();
    add_review(&services, &session, &bootcamp, body).await
}

pub async fn create_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(bootcamp): Path<String>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    add_review(&services, &session, &bootcamp, body).await
}

/// Any reviewer may review any bootcamp, once.
async fn add_review(
    services: &AppServices,
    session: &Session,
    bootcamp: &str,
    body: Fields,
) -> Result<Response, ApiError> {
    require_roles(session, REVIEWERS)?;
    let (bootcamp_id, _) = load_parent(services, bootcamp).await?;

    let mut fields = Review::client_fields(body);
    fields.insert(BOOTCAMP_FIELD.to_string(), Value::String(bootcamp_id.to_string()));
    fields.insert(OWNER_FIELD.to_string(), Value::String(session.user_id().to_string()));
    let review = Review::from_fields(fields)?;

    let doc = services
        .store
        .insert(REVIEWS, Document::new(review.to_fields()?, Utc::now()))
        .await?;
    tracing::info!(id = %doc.id(), bootcamp = %bootcamp_id, user = %session.user_id(), "review created");
    Ok(dto::data(StatusCode::CREATED, doc))
}

pub async fn update_review(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, REVIEWERS)?;
    let doc = services.load(REVIEWS, parse_id(&id)?).await?;
    authorize_change(&services, &session, REVIEWS, &doc, "update").await?;

    let review: Review = common::patched(&doc, body)?;
    let doc = common::save_model(&services, doc, &review).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn delete_review(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_roles(&session, REVIEWERS)?;
    let doc = services.load(REVIEWS, parse_id(&id)?).await?;
    authorize_change(&services, &session, REVIEWS, &doc, "delete").await?;

    services.store.delete(REVIEWS, doc.id()).await?;
    Ok(dto::data(StatusCode::OK, json!({})))
}
