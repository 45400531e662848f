use std::cmp::Ordering;

use serde_json::Value;

use super::filter::compare_values;
use crate::document::{CREATED_AT_FIELD, Document};

/// One sort key; `-field` in a query string means descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub descending: bool,
}

impl SortKey {
    pub fn ascending(path: impl Into<String>) -> Self {
        Self { path: path.into(), descending: false }
    }

    pub fn descending(path: impl Into<String>) -> Self {
        Self { path: path.into(), descending: true }
    }

    pub fn parse(token: &str) -> Self {
        match token.strip_prefix('-') {
            Some(path) => Self::descending(path),
            None => Self::ascending(token.strip_prefix('+').unwrap_or(token)),
        }
    }

    /// Newest first.
    pub fn default_order() -> Vec<SortKey> {
        vec![Self::descending(CREATED_AT_FIELD)]
    }
}

/// Rank of a JSON type in sort order (missing sorts first).
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_by(a: &Document, b: &Document, key: &SortKey) -> Ordering {
    let (va, vb) = (a.get(&key.path), b.get(&key.path));
    let ordering = type_rank(va).cmp(&type_rank(vb)).then_with(|| match (va, vb) {
        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    });
    if key.descending { ordering.reverse() } else { ordering }
}

/// Stable multi-key sort.
pub fn sort_documents(docs: &mut [Document], keys: &[SortKey]) {
    docs.sort_by(|a, b| {
        keys.iter()
            .map(|k| compare_by(a, b, k))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}
