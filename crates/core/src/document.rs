//! Stored documents: a JSON object plus its identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::DomainError;
use crate::id::{ResourceId, UserId};
use crate::time::{format_timestamp, parse_timestamp};

pub const ID_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const OWNER_FIELD: &str = "user";

/// A resource record as held by the store.
///
/// # Invariants
/// - The body always contains `id` (matching `self.id`) and `createdAt`.
/// - Identity fields cannot be overwritten through `set`/`merge`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: ResourceId,
    body: Map<String, Value>,
}

impl Document {
    /// Build a new document with a fresh identifier.
    pub fn new(fields: Map<String, Value>, now: DateTime<Utc>) -> Self {
        Self::with_identity(ResourceId::new(), now, fields)
    }

    pub fn with_identity(id: ResourceId, created_at: DateTime<Utc>, mut fields: Map<String, Value>) -> Self {
        fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        fields.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(format_timestamp(created_at)),
        );
        Self { id, body: fields }
    }

    /// Rehydrate a document previously produced by [`Document::into_value`].
    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        let Value::Object(body) = value else {
            return Err(DomainError::validation(["document must be a JSON object"]));
        };
        let id: ResourceId = body
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::invalid_id("document has no id"))?
            .parse()?;
        if body
            .get(CREATED_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
            .is_none()
        {
            return Err(DomainError::validation(["document has no valid createdAt"]));
        }
        Ok(Self { id, body })
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get_str(CREATED_AT_FIELD).and_then(parse_timestamp)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.body
    }

    /// Resolve a dotted path (`location.city`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.body.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Id stored in a reference field (e.g. `bootcamp`).
    pub fn reference(&self, field: &str) -> Option<ResourceId> {
        self.get_str(field).and_then(|s| s.parse().ok())
    }

    /// The owning user, if the document carries one.
    pub fn owner(&self) -> Option<UserId> {
        self.get_str(OWNER_FIELD).and_then(|s| s.parse().ok())
    }

    /// Set a top-level field. Identity fields are left untouched.
    pub fn set(&mut self, field: &str, value: Value) {
        if is_identity(field) {
            return;
        }
        self.body.insert(field.to_string(), value);
    }

    /// Shallow merge of `patch` into the body (identity fields ignored).
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.set(&key, value);
        }
    }

    /// Replace every non-identity field.
    pub fn replace_fields(&mut self, fields: Map<String, Value>) {
        self.body.retain(|k, _| is_identity(k));
        self.merge(fields);
    }

    /// Copy of this document restricted to `paths` (identity always kept).
    pub fn project(&self, paths: &[String]) -> Document {
        let mut body = Map::new();
        for key in [ID_FIELD, CREATED_AT_FIELD] {
            if let Some(v) = self.body.get(key) {
                body.insert(key.to_string(), v.clone());
            }
        }
        for path in paths {
            let segments: Vec<&str> = path.split('.').collect();
            copy_path(&self.body, &mut body, &segments);
        }
        // createdAt is only kept when selected explicitly.
        if !paths.iter().any(|p| p == CREATED_AT_FIELD) {
            body.remove(CREATED_AT_FIELD);
        }
        Document { id: self.id, body }
    }

    /// Remove fields that must never leave the server.
    pub fn redact(&mut self, hidden: &[&str]) {
        for field in hidden {
            self.body.remove(*field);
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

fn is_identity(field: &str) -> bool {
    field == ID_FIELD || field == CREATED_AT_FIELD
}

fn copy_path(src: &Map<String, Value>, dst: &mut Map<String, Value>, segments: &[&str]) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = src.get(*head) else {
        return;
    };
    if rest.is_empty() {
        dst.insert(head.to_string(), value.clone());
        return;
    }
    let Some(inner) = value.as_object() else {
        return;
    };
    let slot = dst
        .entry(head.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(slot) = slot {
        copy_path(inner, slot, rest);
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.body.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn sample() -> Document {
        let fields = json!({
            "name": "Devworks",
            "user": "0190b5a0-0000-7000-8000-000000000001",
            "location": { "city": "Boston", "state": "MA" },
        });
        let Value::Object(fields) = fields else { unreachable!() };
        Document::new(fields, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    #[test]
    fn identity_fields_are_stamped_and_protected() {
        let mut doc = sample();
        let id = doc.id();
        doc.set("id", json!("other"));
        doc.merge(json!({ "createdAt": "1999-01-01" }).as_object().cloned().unwrap());
        assert_eq!(doc.get_str("id"), Some(id.to_string().as_str()));
        assert_eq!(doc.get_str("createdAt"), Some("2024-01-02T03:04:05.000Z"));
    }

    #[test]
    fn dotted_paths_resolve_nested_values() {
        let doc = sample();
        assert_eq!(doc.get_str("location.city"), Some("Boston"));
        assert!(doc.get("location.zip").is_none());
        assert!(doc.owner().is_some());
    }

    #[test]
    fn projection_keeps_id_and_selected_paths_only() {
        let doc = sample();
        let projected = doc.project(&["location.city".to_string()]);
        assert_eq!(
            projected.into_value(),
            json!({ "id": doc.id().to_string(), "location": { "city": "Boston" } })
        );
    }

    #[test]
    fn from_value_requires_identity() {
        assert!(Document::from_value(json!({ "name": "x" })).is_err());
        let doc = sample();
        let back = Document::from_value(doc.clone().into_value()).unwrap();
        assert_eq!(back, doc);
    }
}
