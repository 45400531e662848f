//! Document store boundary.
//!
//! A `ResourceStore` persists [`Document`]s per [`Collection`], enforces the
//! collection uniqueness constraints, and removes child documents when their
//! parent is deleted. Query semantics (filters, sorting, windows) are
//! identical across implementations.

mod advanced;
pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use devcamper_core::{Collection, Document, Filter, GeoPoint, ResourceId, SortKey};

pub use advanced::{advanced_results, populate};
pub use in_memory::InMemoryResourceStore;
pub use postgres::PostgresResourceStore;

/// Options of a `find` call.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("duplicate key in {collection}: {key}")]
    DuplicateKey { collection: Collection, key: String },

    /// A child document points at a parent that does not exist.
    #[error("{collection} references a missing parent {parent}")]
    MissingParent { collection: Collection, parent: String },

    /// A stored row could not be turned back into a document.
    #[error("corrupt document in {collection}: {reason}")]
    Corrupt { collection: Collection, reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("store lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Persist a new document.
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError>;

    async fn get(&self, collection: Collection, id: ResourceId) -> Result<Option<Document>, StoreError>;

    /// Matching documents, sorted, then windowed by `skip`/`limit`.
    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Overwrite an existing document. Returns `None` when it does not exist.
    async fn replace(&self, collection: Collection, doc: Document) -> Result<Option<Document>, StoreError>;

    /// Remove a document and, transitively, its children. Returns whether
    /// the document existed.
    async fn delete(&self, collection: Collection, id: ResourceId) -> Result<bool, StoreError>;

    /// Documents whose `location` lies within `radius` radians of `center`.
    async fn within_radius(
        &self,
        collection: Collection,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Document>, StoreError>;

    /// Remove every document of a collection (children included). Returns
    /// how many documents of `collection` itself were removed.
    async fn clear(&self, collection: Collection) -> Result<u64, StoreError>;

    async fn find_one(&self, collection: Collection, filter: Filter) -> Result<Option<Document>, StoreError> {
        let options = FindOptions {
            filter,
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.find(collection, &options).await?.into_iter().next())
    }
}

#[async_trait]
impl<S> ResourceStore for Arc<S>
where
    S: ResourceStore + ?Sized,
{
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError> {
        (**self).insert(collection, doc).await
    }

    async fn get(&self, collection: Collection, id: ResourceId) -> Result<Option<Document>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        (**self).find(collection, options).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        (**self).count(collection, filter).await
    }

    async fn replace(&self, collection: Collection, doc: Document) -> Result<Option<Document>, StoreError> {
        (**self).replace(collection, doc).await
    }

    async fn delete(&self, collection: Collection, id: ResourceId) -> Result<bool, StoreError> {
        (**self).delete(collection, id).await
    }

    async fn within_radius(
        &self,
        collection: Collection,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).within_radius(collection, center, radius).await
    }

    async fn clear(&self, collection: Collection) -> Result<u64, StoreError> {
        (**self).clear(collection).await
    }
}
