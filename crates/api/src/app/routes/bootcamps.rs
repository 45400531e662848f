use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension, Multipart, Path, multipart::MultipartRejection},
    http::StatusCode,
    response::Response,
    routing::{get, put},
};
use chrono::Utc;
use serde_json::{Value, json};

use devcamper_core::document::OWNER_FIELD;
use devcamper_core::geo::radius_from_miles;
use devcamper_core::model::{Bootcamp, DEFAULT_PHOTO};
use devcamper_core::{Collection, Document, Expand, Filter, Resource, ResourceId};
use devcamper_infra::UploadError;
use devcamper_infra::geocoder::locate_bootcamp;

use crate::app::dto::{self, Fields, JsonBody};
use crate::app::errors::ApiError;
use crate::app::routes::common::{self, QueryPairs, parse_id};
use crate::app::routes::{courses, reviews};
use crate::app::services::AppServices;
use crate::authz::{PUBLISHERS, authorize_change, require_roles};
use crate::context::Session;

const BOOTCAMPS: Collection = Collection::Bootcamps;

/// Multipart overhead allowed on top of the photo size limit.
const MULTIPART_SLACK: usize = 64 * 1024;

pub fn router(max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(list_bootcamps).post(create_bootcamp))
        .route("/radius/:zipcode/:distance", get(bootcamps_in_radius))
        .route(
            "/:id",
            get(get_bootcamp).put(update_bootcamp).delete(delete_bootcamp),
        )
        .route(
            "/:id/photo",
            // Slightly above the limit so oversized images reach validation.
            put(upload_photo).layer(DefaultBodyLimit::max(
                max_upload_bytes.saturating_mul(2).saturating_add(MULTIPART_SLACK),
            )),
        )
        .route(
            "/:id/courses",
            get(courses::list_for_bootcamp).post(courses::create_for_bootcamp),
        )
        .route(
            "/:id/courses/:course_id",
            get(courses::get_for_bootcamp)
                .put(courses::update_for_bootcamp)
                .delete(courses::delete_for_bootcamp),
        )
        .route(
            "/:id/reviews",
            get(reviews::list_for_bootcamp).post(reviews::create_for_bootcamp),
        )
}

pub async fn list_bootcamps(
    Extension(services): Extension<Arc<AppServices>>,
    pairs: QueryPairs,
) -> Result<Response, ApiError> {
    common::list(&services, BOOTCAMPS, pairs, &[Expand::BOOTCAMP_COURSES]).await
}

pub async fn get_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = common::show(&services, BOOTCAMPS, parse_id(&id)?, &[Expand::BOOTCAMP_COURSES]).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn create_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;

    // Publishers may own a single bootcamp; admins any number.
    if !session.principal.is_admin() {
        let published = services
            .store
            .find_one(BOOTCAMPS, Filter::new().eq(OWNER_FIELD, session.user_id().to_string()))
            .await?;
        if published.is_some() {
            return Err(ApiError::bad_request(format!(
                "The user with ID {} has already published a bootcamp",
                session.user_id()
            )));
        }
    }

    let mut fields = Bootcamp::client_fields(body);
    fields.insert(OWNER_FIELD.to_string(), Value::String(session.user_id().to_string()));
    let mut bootcamp = Bootcamp::from_fields(fields)?;
    bootcamp.refresh_slug();
    locate(&services, &mut bootcamp).await;

    let doc = services
        .store
        .insert(BOOTCAMPS, Document::new(bootcamp.to_fields()?, Utc::now()))
        .await?;
    tracing::info!(id = %doc.id(), user = %session.user_id(), "bootcamp created");
    Ok(dto::data(StatusCode::CREATED, doc))
}

pub async fn update_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<Fields>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let doc = services.load(BOOTCAMPS, parse_id(&id)?).await?;
    authorize_change(&services, &session, BOOTCAMPS, &doc, "update").await?;

    let before = Bootcamp::from_document(&doc)?;
    let mut bootcamp: Bootcamp = common::patched(&doc, body)?;
    if bootcamp.name != before.name {
        bootcamp.refresh_slug();
    }
    if bootcamp.address != before.address {
        bootcamp.location = None;
        locate(&services, &mut bootcamp).await;
    }

    let doc = common::save_model(&services, doc, &bootcamp).await?;
    Ok(dto::data(StatusCode::OK, doc))
}

pub async fn delete_bootcamp(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let doc = services.load(BOOTCAMPS, parse_id(&id)?).await?;
    authorize_change(&services, &session, BOOTCAMPS, &doc, "delete").await?;

    // Courses and reviews go with it.
    services.store.delete(BOOTCAMPS, doc.id()).await?;
    if let Some(photo) = doc.get_str("photo").filter(|p| *p != DEFAULT_PHOTO) {
        if let Err(e) = services.photos.remove(photo).await {
            tracing::warn!(error = %e, photo, "failed to remove bootcamp photo");
        }
    }
    tracing::info!(id = %doc.id(), user = %session.user_id(), "bootcamp deleted");
    Ok(dto::data(StatusCode::OK, json!({})))
}

pub async fn bootcamps_in_radius(
    Extension(services): Extension<Arc<AppServices>>,
    Path((zipcode, distance)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::bad_request(format!("Invalid distance `{distance}`")))?;
    let center = services
        .geocoder
        .geocode(&zipcode)
        .await?
        .ok_or_else(|| ApiError::NoMatch(format!("No location found for zipcode {zipcode}")))?
        .point;

    let docs = services
        .store
        .within_radius(BOOTCAMPS, center, radius_from_miles(distance))
        .await?;
    Ok(dto::counted(docs))
}

pub async fn upload_photo(
    Extension(services): Extension<Arc<AppServices>>,
    session: Session,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    require_roles(&session, PUBLISHERS)?;
    let mut doc = services.load(BOOTCAMPS, parse_id(&id)?).await?;
    authorize_change(&services, &session, BOOTCAMPS, &doc, "update").await?;

    let mut multipart = multipart.map_err(|_| UploadError::Missing)?;
    let upload = next_file(&mut multipart).await?.ok_or(UploadError::Missing)?;

    // Validation happens inside `stage`, before anything is written.
    let staged = services
        .photos
        .stage(
            doc.id(),
            upload.file_name.as_deref(),
            upload.content_type.as_deref(),
            &upload.bytes,
        )
        .await?;
    let name = staged.name().to_string();
    let previous = doc.get_str("photo").map(str::to_string);

    doc.set("photo", Value::String(name.clone()));
    let doc = match services.save(BOOTCAMPS, doc).await {
        Ok(doc) => doc,
        Err(e) => {
            services.photos.discard(staged).await;
            return Err(e);
        }
    };
    if let Err(e) = services.photos.commit(staged).await {
        restore_photo(&services, doc, previous).await;
        return Err(e.into());
    }

    // A different extension leaves the old file behind under another name.
    if let Some(old) = previous.filter(|p| *p != name && p != DEFAULT_PHOTO) {
        if let Err(e) = services.photos.remove(&old).await {
            tracing::warn!(error = %e, file = %old, "failed to remove replaced photo");
        }
    }
    Ok(dto::data(StatusCode::OK, name))
}

/// Point the bootcamp back at the photo it had before a failed upload.
async fn restore_photo(services: &AppServices, mut doc: Document, previous: Option<String>) {
    let photo = previous.unwrap_or_else(|| DEFAULT_PHOTO.to_string());
    doc.set("photo", Value::String(photo));
    if let Err(e) = services.save(BOOTCAMPS, doc).await {
        tracing::error!(error = %e, "failed to restore bootcamp photo after upload failure");
    }
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

/// The multipart field named `file`, if any.
async fn next_file(multipart: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        return Ok(Some(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

/// Geocode the bootcamp's address; a failed lookup leaves it without a
/// location.
async fn locate(services: &AppServices, bootcamp: &mut Bootcamp) {
    if let Err(e) = locate_bootcamp(&*services.geocoder, bootcamp).await {
        tracing::warn!(error = %e, "geocoding failed");
    }
}

/// The bootcamp a nested route points at.
pub(crate) async fn load_parent(services: &AppServices, raw: &str) -> Result<(ResourceId, Document), ApiError> {
    let id = parse_id(raw)?;
    Ok((id, services.load(BOOTCAMPS, id).await?))
}
