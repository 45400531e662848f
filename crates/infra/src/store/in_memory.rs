//! In-memory document store for tests/dev.
//!
//! Documents are kept per collection in insertion order. Unique keys and
//! parent/child cascades are enforced here the way the Postgres schema
//! enforces them.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use devcamper_core::query::sort_documents;
use devcamper_core::{Collection, Document, Filter, GeoPoint, ResourceId};

use super::{FindOptions, ResourceStore, StoreError};

type Collections = HashMap<Collection, Vec<Document>>;

#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    inner: RwLock<Collections>,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Values of a unique key on `doc`; `None` when any part is missing.
fn key_values<'a>(doc: &'a Document, key: &[&str]) -> Option<Vec<&'a Value>> {
    key.iter().map(|field| doc.get(field)).collect()
}

fn check_unique(map: &Collections, collection: Collection, doc: &Document) -> Result<(), StoreError> {
    let Some(existing) = map.get(&collection) else {
        return Ok(());
    };
    for key in collection.unique_keys() {
        let Some(values) = key_values(doc, key) else {
            continue;
        };
        let clash = existing
            .iter()
            .filter(|other| other.id() != doc.id())
            .any(|other| key_values(other, key).as_ref() == Some(&values));
        if clash {
            return Err(StoreError::DuplicateKey {
                collection,
                key: key.join(","),
            });
        }
    }
    Ok(())
}

fn check_parent(map: &Collections, collection: Collection, doc: &Document) -> Result<(), StoreError> {
    let Some(parent) = collection.parent() else {
        return Ok(());
    };
    let Some(raw) = doc.get_str(parent.field) else {
        return Ok(());
    };
    let exists = raw.parse::<ResourceId>().is_ok_and(|id| {
        map.get(&parent.collection)
            .is_some_and(|docs| docs.iter().any(|d| d.id() == id))
    });
    if exists {
        Ok(())
    } else {
        Err(StoreError::MissingParent {
            collection,
            parent: raw.to_string(),
        })
    }
}

/// Remove `ids` from `collection` and everything that hangs off them.
fn cascade(map: &mut Collections, collection: Collection, ids: &[ResourceId]) -> u64 {
    if ids.is_empty() {
        return 0;
    }
    let mut removed = 0;
    if let Some(docs) = map.get_mut(&collection) {
        let before = docs.len();
        docs.retain(|d| !ids.contains(&d.id()));
        removed += (before - docs.len()) as u64;
    }
    for (child, parent) in collection.children() {
        let orphans: Vec<ResourceId> = map
            .get(&child)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.reference(parent.field).is_some_and(|p| ids.contains(&p)))
                    .map(Document::id)
                    .collect()
            })
            .unwrap_or_default();
        removed += cascade(map, child, &orphans);
    }
    removed
}

fn located(doc: &Document) -> Option<GeoPoint> {
    doc.get("location.coordinates")
        .and_then(Value::as_array)
        .and_then(|coords| GeoPoint::from_coordinates(coords))
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        check_parent(&map, collection, &doc)?;
        check_unique(&map, collection, &doc)?;
        map.entry(collection).or_default().push(doc.clone());
        Ok(doc)
    }

    async fn get(&self, collection: Collection, id: ResourceId) -> Result<Option<Document>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(&collection)
            .and_then(|docs| docs.iter().find(|d| d.id() == id))
            .cloned())
    }

    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        let mut matched: Vec<Document> = {
            let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
            map.get(&collection)
                .map(|docs| docs.iter().filter(|d| options.filter.matches(d)).cloned().collect())
                .unwrap_or_default()
        };
        sort_documents(&mut matched, &options.sort);
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched.into_iter().skip(skip).take(limit).collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(&collection)
            .map_or(0, |docs| docs.iter().filter(|d| filter.matches(d)).count() as u64))
    }

    async fn replace(&self, collection: Collection, doc: Document) -> Result<Option<Document>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let exists = map
            .get(&collection)
            .is_some_and(|docs| docs.iter().any(|d| d.id() == doc.id()));
        if !exists {
            return Ok(None);
        }
        check_parent(&map, collection, &doc)?;
        check_unique(&map, collection, &doc)?;
        let slot = map
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id() == doc.id()));
        match slot {
            Some(slot) => {
                *slot = doc.clone();
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: Collection, id: ResourceId) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let exists = map
            .get(&collection)
            .is_some_and(|docs| docs.iter().any(|d| d.id() == id));
        if exists {
            cascade(&mut map, collection, &[id]);
        }
        Ok(exists)
    }

    async fn within_radius(
        &self,
        collection: Collection,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Document>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| located(d).is_some_and(|p| p.angular_distance(&center) <= radius))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn clear(&self, collection: Collection) -> Result<u64, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let ids: Vec<ResourceId> = map
            .get(&collection)
            .map(|docs| docs.iter().map(Document::id).collect())
            .unwrap_or_default();
        cascade(&mut map, collection, &ids);
        Ok(ids.len() as u64)
    }
}
