use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;
use crate::time::parse_timestamp;

/// Comparison operator of a filter condition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Set membership.
    In,
}

impl Operator {
    /// Parse an operator token as it appears in a query string.
    /// Equality has no token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
        }
    }

    fn accepts(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (_, None) => false,
            (Operator::Eq | Operator::In, Some(o)) => o == Ordering::Equal,
            (Operator::Gt, Some(o)) => o == Ordering::Greater,
            (Operator::Gte, Some(o)) => o != Ordering::Less,
            (Operator::Lt, Some(o)) => o == Ordering::Less,
            (Operator::Lte, Some(o)) => o != Ordering::Greater,
        }
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Single(Value),
    List(Vec<Value>),
}

/// `path <op> value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: String,
    pub op: Operator,
    pub value: FilterValue,
}

impl Condition {
    pub fn matches(&self, doc: &Document) -> bool {
        let Some(actual) = doc.get(&self.path) else {
            return false;
        };
        match &self.value {
            FilterValue::List(options) => {
                self.op == Operator::In
                    && options
                        .iter()
                        .any(|o| any_element(actual, |v| Operator::Eq.accepts(compare_values(v, o))))
            }
            FilterValue::Single(expected) => {
                any_element(actual, |v| self.op.accepts(compare_values(v, expected)))
            }
        }
    }
}

/// Arrays match when any element matches.
fn any_element(actual: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(pred),
        other => pred(other),
    }
}

/// Order two JSON scalars of the same type. Timestamps compare
/// chronologically; mixed types are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(tx), Some(ty)) => Some(tx.cmp(&ty)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Conjunction of conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(path, Operator::Eq, value)
    }

    pub fn compare(mut self, path: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            path: path.into(),
            op,
            value: FilterValue::Single(value.into()),
        });
        self
    }

    pub fn one_of(mut self, path: impl Into<String>, values: Vec<Value>) -> Self {
        self.conditions.push(Condition {
            path: path.into(),
            op: Operator::In,
            value: FilterValue::List(values),
        });
        self
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        let Value::Object(fields) = value else { unreachable!() };
        Document::new(fields, Utc::now())
    }

    #[test]
    fn comparison_operators_on_numbers() {
        let d = doc(json!({ "averageCost": 10000 }));
        assert!(Filter::new().compare("averageCost", Operator::Lte, 10000.0).matches(&d));
        assert!(Filter::new().compare("averageCost", Operator::Gt, 9999).matches(&d));
        assert!(!Filter::new().compare("averageCost", Operator::Lt, 10000).matches(&d));
    }

    #[test]
    fn equality_on_lists_means_contains() {
        let d = doc(json!({ "careers": ["Web Development", "Business"] }));
        assert!(Filter::new().eq("careers", "Business").matches(&d));
        assert!(!Filter::new().eq("careers", "UI/UX").matches(&d));
    }

    #[test]
    fn membership_matches_any_option() {
        let d = doc(json!({ "minimumSkill": "beginner" }));
        let f = Filter::new().one_of("minimumSkill", vec![json!("advanced"), json!("beginner")]);
        assert!(f.matches(&d));
    }

    #[test]
    fn missing_fields_never_match() {
        let d = doc(json!({ "name": "x" }));
        assert!(!Filter::new().compare("rating", Operator::Gte, 1).matches(&d));
    }

    #[test]
    fn timestamps_compare_chronologically() {
        assert_eq!(
            compare_values(&json!("2024-01-01T10:00:00.000Z"), &json!("2024-01-01T09:00:00+00:00")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn mixed_types_are_unordered() {
        assert_eq!(compare_values(&json!(1), &json!("1")), None);
    }
}
