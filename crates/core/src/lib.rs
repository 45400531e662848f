//! `devcamper-core`: resource model building blocks.
//!
//! This crate contains **pure** primitives (no IO): identifiers, the
//! collection schemas, documents, model validation and the list-query
//! translator.

pub mod collection;
pub mod document;
pub mod envelope;
pub mod error;
pub mod geo;
pub mod id;
pub mod model;
pub mod query;
pub mod time;

pub use collection::{Collection, FieldKind, FieldSpec, Ownership, ParentRef};
pub use document::Document;
pub use envelope::{Envelope, PageLink, PageWindow, PaginationLinks};
pub use error::{DomainError, DomainResult};
pub use geo::GeoPoint;
pub use id::{ResourceId, UserId};
pub use model::Resource;
pub use query::{Condition, Expand, Filter, FilterValue, ListQuery, Operator, QueryError, SortKey};
