//! List execution: run a translated [`ListQuery`] against a store and build
//! the paginated envelope.

use std::collections::HashMap;

use serde_json::Value;

use devcamper_core::document::ID_FIELD;
use devcamper_core::{Collection, Document, Envelope, Expand, Filter, ListQuery, ResourceId};

use super::{FindOptions, ResourceStore, StoreError};

/// Execute `query` on `collection`.
///
/// The page of records is fetched with the query's filter, sort and window;
/// `total` counts the whole collection. Selection is applied before
/// references are expanded, and hidden fields are removed last.
pub async fn advanced_results<S>(
    store: &S,
    collection: Collection,
    query: &ListQuery,
    expand: &[Expand],
) -> Result<Envelope, StoreError>
where
    S: ResourceStore + ?Sized,
{
    let options = FindOptions {
        filter: query.filter.clone(),
        sort: query.sort.clone(),
        skip: query.window.start_index(),
        limit: Some(query.window.limit),
    };
    let mut docs = store.find(collection, &options).await?;
    let total = store.count(collection, &Filter::new()).await?;

    if let Some(select) = &query.select {
        docs = docs.iter().map(|d| d.project(select)).collect();
    }
    populate(store, &mut docs, expand).await?;
    for doc in &mut docs {
        doc.redact(collection.hidden_fields());
    }

    tracing::debug!(%collection, count = docs.len(), total, "list executed");
    Ok(Envelope::new(docs, total, query.window))
}

/// Apply reference expansions to `docs` in place, one batched lookup per
/// directive.
pub async fn populate<S>(store: &S, docs: &mut [Document], expand: &[Expand]) -> Result<(), StoreError>
where
    S: ResourceStore + ?Sized,
{
    for directive in expand {
        match *directive {
            Expand::Reference { field, target, select } => {
                let ids = distinct(docs.iter().filter_map(|d| d.reference(field)));
                if ids.is_empty() {
                    continue;
                }
                let found = store
                    .find(target, &FindOptions::filtered(Filter::new().one_of(ID_FIELD, ids)))
                    .await?;
                let by_id: HashMap<ResourceId, Value> = found
                    .into_iter()
                    .map(|d| {
                        let mut d = match select {
                            Some(paths) => d.project(&paths.iter().map(|p| p.to_string()).collect::<Vec<_>>()),
                            None => d,
                        };
                        d.redact(target.hidden_fields());
                        (d.id(), d.into_value())
                    })
                    .collect();
                for doc in docs.iter_mut() {
                    if let Some(value) = doc.reference(field).and_then(|id| by_id.get(&id)) {
                        doc.set(field, value.clone());
                    }
                }
            }
            Expand::Children {
                field,
                source,
                foreign_field,
            } => {
                let ids = distinct(docs.iter().map(Document::id));
                if ids.is_empty() {
                    continue;
                }
                let children = store
                    .find(
                        source,
                        &FindOptions::filtered(Filter::new().one_of(foreign_field, ids)),
                    )
                    .await?;
                let mut grouped: HashMap<ResourceId, Vec<Value>> = HashMap::new();
                for mut child in children {
                    child.redact(source.hidden_fields());
                    if let Some(parent) = child.reference(foreign_field) {
                        grouped.entry(parent).or_default().push(child.into_value());
                    }
                }
                for doc in docs.iter_mut() {
                    let items = grouped.remove(&doc.id()).unwrap_or_default();
                    doc.set(field, Value::Array(items));
                }
            }
        }
    }
    Ok(())
}

fn distinct(ids: impl Iterator<Item = ResourceId>) -> Vec<Value> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen.into_iter().map(|id| Value::String(id.to_string())).collect()
}
