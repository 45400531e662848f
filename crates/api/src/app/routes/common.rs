use axum::{
    Json,
    extract::{Query, rejection::QueryRejection},
    response::{IntoResponse, Response},
};

use devcamper_core::document::{CREATED_AT_FIELD, ID_FIELD};
use devcamper_core::{Collection, Document, Expand, Filter, ListQuery, Resource, ResourceId};
use devcamper_infra::store::{FindOptions, advanced_results, populate};

use crate::app::dto::{self, Fields};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

/// Raw query-string pairs, in request order.
pub type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// Parse a path id; malformed ids are reported as not found.
pub fn parse_id(raw: &str) -> Result<ResourceId, ApiError> {
    raw.parse().map_err(|_| ApiError::BadCast(raw.to_string()))
}

/// Paginated list of `collection` driven by the request's query string.
pub async fn list(
    services: &AppServices,
    collection: Collection,
    pairs: QueryPairs,
    expand: &[Expand],
) -> Result<Response, ApiError> {
    let Query(pairs) = pairs.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let query = ListQuery::from_params(collection, &pairs)?;
    let envelope = advanced_results(&*services.store, collection, &query, expand).await?;
    Ok(Json(envelope).into_response())
}

/// Every `collection` document attached to `parent`, unpaginated.
pub async fn list_children(
    services: &AppServices,
    collection: Collection,
    parent: ResourceId,
    expand: &[Expand],
) -> Result<Response, ApiError> {
    let Some(parent_ref) = collection.parent() else {
        return Err(ApiError::internal(format!("{collection} has no parent")));
    };
    services.load(parent_ref.collection, parent).await?;

    let options = FindOptions {
        filter: Filter::new().eq(parent_ref.field, parent.to_string()),
        sort: ListQuery::default().sort,
        ..Default::default()
    };
    let mut docs = services.store.find(collection, &options).await?;
    populate(&*services.store, &mut docs, expand).await?;
    Ok(dto::counted(
        docs.into_iter().map(|d| dto::present(collection, d)).collect(),
    ))
}

/// One document with its expansions applied.
pub async fn show(
    services: &AppServices,
    collection: Collection,
    id: ResourceId,
    expand: &[Expand],
) -> Result<Document, ApiError> {
    let doc = services.load(collection, id).await?;
    let mut docs = [doc];
    populate(&*services.store, &mut docs, expand).await?;
    let [doc] = docs;
    Ok(dto::present(collection, doc))
}

/// Apply a client patch to the stored fields of `doc` and re-validate the
/// result as `R`. Identity and server-managed fields in the patch are
/// ignored.
pub fn patched<R: Resource>(doc: &Document, patch: Fields) -> Result<R, ApiError> {
    let mut fields = doc.fields().clone();
    fields.remove(ID_FIELD);
    fields.remove(CREATED_AT_FIELD);
    fields.extend(R::client_fields(patch));
    Ok(R::from_fields(fields)?)
}

/// Store `model` as the new body of `doc`.
pub async fn save_model<R: Resource>(
    services: &AppServices,
    mut doc: Document,
    model: &R,
) -> Result<Document, ApiError> {
    doc.replace_fields(model.to_fields()?);
    services.save(R::COLLECTION, doc).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use devcamper_core::model::Review;

    use super::*;

    #[test]
    fn malformed_ids_are_bad_casts() {
        let err = parse_id("5d713995b721c3bb38c1f5d0").unwrap_err();
        assert_eq!(err.to_string(), "Resource not found with id of 5d713995b721c3bb38c1f5d0");
    }

    #[test]
    fn patches_cannot_move_managed_fields() {
        let owner = devcamper_core::UserId::new();
        let bootcamp = ResourceId::new();
        let fields = json!({
            "title": "Good",
            "text": "Solid",
            "rating": 7,
            "bootcamp": bootcamp.to_string(),
            "user": owner.to_string(),
        });
        let doc = Document::new(fields.as_object().cloned().unwrap(), chrono::Utc::now());
        let patch = json!({ "rating": 9, "user": devcamper_core::UserId::new().to_string() });
        let review: Review = patched(&doc, patch.as_object().cloned().unwrap()).unwrap();
        assert_eq!(review.rating, Some(9.0));
        assert_eq!(review.user, Some(owner));
    }

    #[test]
    fn invalid_patches_are_rejected() {
        let fields = json!({
            "title": "Good",
            "text": "Solid",
            "rating": 7,
            "bootcamp": ResourceId::new().to_string(),
            "user": devcamper_core::UserId::new().to_string(),
        });
        let doc = Document::new(fields.as_object().cloned().unwrap(), chrono::Utc::now());
        let patch = json!({ "rating": 11 });
        let err = patched::<Review>(&doc, patch.as_object().cloned().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Please add a rating between 1 and 10");
    }
}
