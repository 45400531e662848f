//! Seed data: bulk import and removal of the four collections.
//!
//! A data directory holds `users.json`, `bootcamps.json`, `courses.json`
//! and `reviews.json`, each a JSON array of documents. Records may carry
//! their own `id`/`createdAt` so references between files line up; user
//! passwords are plaintext in the files and hashed on import.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use devcamper_auth::{AuthError, UserAccount};
use devcamper_core::document::{CREATED_AT_FIELD, ID_FIELD};
use devcamper_core::model::{Bootcamp, Course, Review};
use devcamper_core::time::parse_timestamp;
use devcamper_core::{Collection, Document, DomainError, Resource, ResourceId};

use crate::geocoder::{GeocodeError, Geocoder, locate_bootcamp};
use crate::store::{ResourceStore, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a JSON array of objects: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{collection} record #{index} is invalid: {source}")]
    Invalid {
        collection: Collection,
        index: usize,
        #[source]
        source: DomainError,
    },

    #[error("user record #{index}: {source}")]
    User {
        index: usize,
        #[source]
        source: AuthError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub users: Vec<Map<String, Value>>,
    pub bootcamps: Vec<Map<String, Value>>,
    pub courses: Vec<Map<String, Value>>,
    pub reviews: Vec<Map<String, Value>>,
}

/// Per-collection counts of an import or removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: u64,
    pub bootcamps: u64,
    pub courses: u64,
    pub reviews: u64,
}

impl SeedData {
    /// Load every collection file from `dir`. A missing file is an empty
    /// collection.
    pub fn load_dir(dir: &Path) -> Result<Self, SeedError> {
        Ok(Self {
            users: read_records(&dir.join("users.json"))?,
            bootcamps: read_records(&dir.join("bootcamps.json"))?,
            courses: read_records(&dir.join("courses.json"))?,
            reviews: read_records(&dir.join("reviews.json"))?,
        })
    }
}

fn read_records(path: &Path) -> Result<Vec<Map<String, Value>>, SeedError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SeedError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&raw).map_err(|source| SeedError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Split the identity out of a seed record.
fn identity(
    collection: Collection,
    index: usize,
    fields: &mut Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<(ResourceId, DateTime<Utc>), SeedError> {
    let invalid = |source| SeedError::Invalid {
        collection,
        index,
        source,
    };
    let id: ResourceId = match fields.remove(ID_FIELD) {
        Some(Value::String(raw)) => raw.parse().map_err(invalid)?,
        Some(other) => return Err(invalid(DomainError::invalid_id(other.to_string()))),
        None => ResourceId::new(),
    };
    let created_at = match fields.remove(CREATED_AT_FIELD) {
        Some(Value::String(raw)) => parse_timestamp(&raw).ok_or_else(|| {
            invalid(DomainError::validation([format!("invalid createdAt '{raw}'")]))
        })?,
        Some(other) => {
            return Err(invalid(DomainError::validation([format!(
                "invalid createdAt {other}"
            )])));
        }
        None => now,
    };
    Ok((id, created_at))
}

fn checked<R: Resource>(index: usize, fields: Map<String, Value>) -> Result<R, SeedError> {
    R::from_fields(fields).map_err(|source| SeedError::Invalid {
        collection: R::COLLECTION,
        index,
        source,
    })
}

fn to_fields<R: Resource>(index: usize, model: &R) -> Result<Map<String, Value>, SeedError> {
    model.to_fields().map_err(|source| SeedError::Invalid {
        collection: R::COLLECTION,
        index,
        source,
    })
}

/// Insert `data` in dependency order: users, bootcamps, courses, reviews.
#[tracing::instrument(skip_all, err)]
pub async fn import<S, G>(
    store: &S,
    geocoder: &G,
    data: SeedData,
    now: DateTime<Utc>,
) -> Result<SeedReport, SeedError>
where
    S: ResourceStore + ?Sized,
    G: Geocoder + ?Sized,
{
    let mut report = SeedReport::default();

    for (index, mut fields) in data.users.into_iter().enumerate() {
        let (id, created_at) = identity(Collection::Users, index, &mut fields, now)?;
        let account =
            UserAccount::from_input(fields).map_err(|source| SeedError::User { index, source })?;
        let fields = to_fields(index, &account)?;
        store
            .insert(Collection::Users, Document::with_identity(id, created_at, fields))
            .await?;
        report.users += 1;
    }

    for (index, mut fields) in data.bootcamps.into_iter().enumerate() {
        let (id, created_at) = identity(Collection::Bootcamps, index, &mut fields, now)?;
        let mut bootcamp: Bootcamp = checked(index, fields)?;
        bootcamp.refresh_slug();
        if bootcamp.location.is_none() {
            locate_bootcamp(geocoder, &mut bootcamp).await?;
        }
        let fields = to_fields(index, &bootcamp)?;
        store
            .insert(Collection::Bootcamps, Document::with_identity(id, created_at, fields))
            .await?;
        report.bootcamps += 1;
    }

    for (index, mut fields) in data.courses.into_iter().enumerate() {
        let (id, created_at) = identity(Collection::Courses, index, &mut fields, now)?;
        let course: Course = checked(index, fields)?;
        let fields = to_fields(index, &course)?;
        store
            .insert(Collection::Courses, Document::with_identity(id, created_at, fields))
            .await?;
        report.courses += 1;
    }

    for (index, mut fields) in data.reviews.into_iter().enumerate() {
        let (id, created_at) = identity(Collection::Reviews, index, &mut fields, now)?;
        let review: Review = checked(index, fields)?;
        let fields = to_fields(index, &review)?;
        store
            .insert(Collection::Reviews, Document::with_identity(id, created_at, fields))
            .await?;
        report.reviews += 1;
    }

    tracing::info!(?report, "seed data imported");
    Ok(report)
}

/// Remove every document of the four collections.
#[tracing::instrument(skip_all, err)]
pub async fn destroy<S>(store: &S) -> Result<SeedReport, SeedError>
where
    S: ResourceStore + ?Sized,
{
    // Children first so their counts are not swallowed by the cascade.
    let report = SeedReport {
        reviews: store.clear(Collection::Reviews).await?,
        courses: store.clear(Collection::Courses).await?,
        bootcamps: store.clear(Collection::Bootcamps).await?,
        users: store.clear(Collection::Users).await?,
    };
    tracing::info!(?report, "seed data destroyed");
    Ok(report)
}
