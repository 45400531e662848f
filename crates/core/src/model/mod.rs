//! Typed resource models.
//!
//! Documents travel as JSON; a model is the typed, validated view of a
//! document body used whenever a document is created or changed.

mod bootcamp;
mod course;
mod review;
pub mod validate;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

pub use bootcamp::{Bootcamp, CAREERS, DEFAULT_PHOTO, Location};
pub use course::{Course, MINIMUM_SKILLS};
pub use review::Review;

use crate::collection::Collection;
use crate::document::{CREATED_AT_FIELD, Document, ID_FIELD};
use crate::error::DomainError;

/// A validated document body of one collection.
pub trait Resource: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    /// Fields only the server may set; stripped from client input.
    const MANAGED_FIELDS: &'static [&'static str];

    /// Check every rule and report all violations at once.
    fn validate(&self) -> Result<(), DomainError>;

    fn from_fields(fields: Map<String, Value>) -> Result<Self, DomainError> {
        let model: Self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| DomainError::validation([e.to_string()]))?;
        model.validate()?;
        Ok(model)
    }

    fn from_document(doc: &Document) -> Result<Self, DomainError> {
        Self::from_fields(doc.fields().clone())
    }

    fn to_fields(&self) -> Result<Map<String, Value>, DomainError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(fields)) => Ok(fields),
            Ok(_) => Err(DomainError::validation(["model did not serialize to an object"])),
            Err(e) => Err(DomainError::validation([e.to_string()])),
        }
    }

    /// Drop identity and server-managed keys from client input.
    fn client_fields(mut input: Map<String, Value>) -> Map<String, Value> {
        input.remove(ID_FIELD);
        input.remove(CREATED_AT_FIELD);
        for field in Self::MANAGED_FIELDS {
            input.remove(*field);
        }
        input
    }
}
