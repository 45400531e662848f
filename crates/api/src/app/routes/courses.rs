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
use devcamper_core::model::Course;
use devcamper_core::{Collection, Document, Expand, Resource, ResourceId};

use crate::app::dto::{self, Fields, JsonBody};
use crate::app::errors::ApiError;
use crate::app::routes::bootcamps::load_parent;
use crate::app::routes::common::{self, QueryPairs, parse_id};
use crate::app::services::AppServices;
use crate::authz::{PUBLISHERS, authorize_change, require_roles};
use crate::context::Session;

const COURSES: Collection = Collection::Courses;
const BOOTCAMP_FIELD: &str = "bootcamp";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:id", get(get_course).put(update_course).delete(delete_course))
}

pub async fn list_courses(
    Extension(services): Extension<Arc<AppServices>>,
    pairs: QueryPairs,
) -> Result<Response, ApiError> {
    common::list(&services, COURSES, pairs, &[Expand::BOOTCAMP_SUMMARY]).await
}

pub async fn list_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    Path(bootcamp): Path<String>,
) -> Result<Response, ApiError> {
    common::list_children(&services, COURSES, parse_id(&bootcamp)?, &[]).await
}

pub async fn get_course(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = common::show(&services, COURSES, parse_id(&id)?, &[Expand::BOOTCAMP_SUMMARY]).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn get_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    Path((bootcamp, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (bootcamp, _) = load_parent(&services, &bootcamp).await?;
    let doc = load_child(&services, bootcamp, &id).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

/// `POST /courses` with the bootcamp id in the body.
pub async fn create_course(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    let bootcamp = body
        .get(BOOTCAMP_FIELD)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::Validation(vec!["Course must belong to a bootcamp".to_string()]))?
        .to_string();
    add_course(&services, &session, &bootcamp, body).await
}

pub async fn create_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(bootcamp): Path<String>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    add_course(&services, &session, &bootcamp, body).await
}

async fn add_course(
    services: &AppServices,
    session: &Session,
    bootcamp: &str,
    body: Fields,
) -> Result<Response, ApiError> {
    require_roles(session, PUBLISHERS)?;
    let (bootcamp_id, bootcamp) = load_parent(services, bootcamp).await?;
    authorize_change(services, session, Collection::Bootcamps, &bootcamp, "add a course to").await?;

    let mut fields = Course::client_fields(body);
    fields.insert(BOOTCAMP_FIELD.to_string(), Value::String(bootcamp_id.to_string()));
    fields.insert(OWNER_FIELD.to_string(), Value::String(session.user_id().to_string()));
    let course = Course::from_fields(fields)?;

    let doc = services
        .store
        .insert(COURSES, Document::new(course.to_fields()?, Utc::now()))
        .await?;
    tracing::info!(id = %doc.id(), bootcamp = %bootcamp_id, "course created");
    Ok(dto::data(StatusCode::CREATED, doc))
}

pub async fn update_course(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let doc = services.load(COURSES, parse_id(&id)?).await?;
    change_course(&services, &session, doc, body).await
}

pub async fn update_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path((bootcamp, id)): Path<(String, String)>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let (bootcamp, _) = load_parent(&services, &bootcamp).await?;
    let doc = load_child(&services, bootcamp, &id).await?;
    change_course(&services, &session, doc, body).await
}

async fn change_course(
    services: &AppServices,
    session: &Session,
    doc: Document,
    body: Fields,
) -> Result<Response, ApiError> {
    authorize_change(services, session, COURSES, &doc, "update").await?;
    let course: Course = common::patched(&doc, body)?;
    let doc = common::save_model(services, doc, &course).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn delete_course(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let doc = services.load(COURSES, parse_id(&id)?).await?;
    remove_course(&services, &session, doc).await
}

pub async fn delete_for_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path((bootcamp, id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let (bootcamp, _) = load_parent(&services, &bootcamp).await?;
    let doc = load_child(&services, bootcamp, &id).await?;
    remove_course(&services, &session, doc).await
}

async fn remove_course(services: &AppServices, session: &Session, doc: Document) -> Result<Response, ApiError> {
    authorize_change(services, session, COURSES, &doc, "delete").await?;
    services.store.delete(COURSES, doc.id()).await?;
    Ok(dto::data(StatusCode::OK, json!({})))
}

/// A course that must belong to `bootcamp`; any other course is reported
/// as not found.
async fn load_child(services: &AppServices, bootcamp: ResourceId, raw: &str) -> Result<Document, ApiError> {
    let id = parse_id(raw)?;
    let doc = services.load(COURSES, id).await?;
    if doc.reference(BOOTCAMP_FIELD) != Some(bootcamp) {
        return Err(ApiError::not_found(COURSES, id));
    }
    Ok(doc)
}
