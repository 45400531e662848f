use serde_json::Value;

use super::filter::{Condition, Filter, FilterValue, Operator};
use super::sort::SortKey;
use super::QueryError;
use crate::collection::{Collection, FieldKind, FieldSpec};
use crate::envelope::PageWindow;
use crate::id::ResourceId;
use crate::time::{format_timestamp, parse_timestamp};

/// Reserved parameter names; they steer selection/sort/paging and are
/// never part of the filter.
pub const CONTROL_KEYS: [&str; 4] = ["select", "sort", "page", "limit"];

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 100;

/// A fully translated list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    /// Fields to keep in each record (`id` is always kept).
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub window: PageWindow,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filter: Filter::new(),
            select: None,
            sort: SortKey::default_order(),
            window: PageWindow::default(),
        }
    }
}

impl ListQuery {
    /// Translate raw query-string pairs for `collection`.
    ///
    /// Filter keys accept `field=value`, `field[op]=value` and
    /// `field=op:value` with `op` one of `gt`, `gte`, `lt`, `lte`, `in`
    /// (`in` takes a comma-separated list). Fields must be on the
    /// collection's allow-list and values must parse as the field's type.
    /// Bad `page`/`limit` values fall back to the defaults.
    pub fn from_params<K, V>(collection: Collection, params: &[(K, V)]) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = ListQuery::default();
        let mut page = None;
        let mut limit = None;

        for (key, raw) in params {
            let (key, raw) = (key.as_ref(), raw.as_ref());
            let (field, bracket_op) = split_key(key)?;
            match field {
                "select" => query.select = Some(parse_select(collection, raw)?),
                "sort" => query.sort = parse_sort(collection, raw)?,
                "page" => page = Some(raw),
                "limit" => limit = Some(raw),
                _ => query.filter.push(parse_condition(collection, field, bracket_op, raw)?),
            }
        }

        query.window = PageWindow::new(
            page.and_then(parse_positive).unwrap_or(DEFAULT_PAGE),
            limit.and_then(parse_positive).unwrap_or(DEFAULT_LIMIT),
        );
        Ok(query)
    }
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// `averageCost[lte]` → (`averageCost`, Some(`lte`)).
fn split_key(key: &str) -> Result<(&str, Option<&str>), QueryError> {
    match key.split_once('[') {
        None => Ok((key, None)),
        Some((field, rest)) => match rest.strip_suffix(']') {
            Some(op) if !field.is_empty() && !op.contains(['[', ']']) => Ok((field, Some(op))),
            _ => Err(QueryError::UnknownField(key.to_string())),
        },
    }
}

fn lookup(collection: Collection, path: &str) -> Result<&'static FieldSpec, QueryError> {
    collection
        .field(path)
        .ok_or_else(|| QueryError::UnknownField(path.to_string()))
}

fn parse_condition(
    collection: Collection,
    field: &str,
    bracket_op: Option<&str>,
    raw: &str,
) -> Result<Condition, QueryError> {
    let spec = lookup(collection, field)?;

    let (op, raw) = match bracket_op {
        Some(token) => {
            let op = Operator::parse(token).ok_or_else(|| QueryError::UnknownOperator {
                field: field.to_string(),
                operator: token.to_string(),
            })?;
            (op, raw)
        }
        None => match raw.split_once(':') {
            Some((token, rest)) => match Operator::parse(token) {
                Some(op) => (op, rest),
                None => (Operator::Eq, raw),
            },
            None => (Operator::Eq, raw),
        },
    };

    let value = if op == Operator::In {
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|item| parse_scalar(spec, item))
            .collect::<Result<Vec<_>, _>>()?;
        FilterValue::List(items)
    } else {
        FilterValue::Single(parse_scalar(spec, raw)?)
    };

    Ok(Condition {
        path: spec.path.to_string(),
        op,
        value,
    })
}

fn parse_scalar(spec: &FieldSpec, raw: &str) -> Result<Value, QueryError> {
    let invalid = || QueryError::InvalidValue {
        field: spec.path.to_string(),
        value: raw.to_string(),
    };
    let trimmed = raw.trim();
    match spec.kind {
        FieldKind::Text | FieldKind::TextList => Ok(Value::String(raw.to_string())),
        FieldKind::Number => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        FieldKind::Bool => match trimmed {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
        FieldKind::Date => parse_timestamp(trimmed)
            .map(|at| Value::String(format_timestamp(at)))
            .ok_or_else(invalid),
        FieldKind::Id => trimmed
            .parse::<ResourceId>()
            .map(|id| Value::String(id.to_string()))
            .map_err(|_| invalid()),
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_select(collection: Collection, raw: &str) -> Result<Vec<String>, QueryError> {
    split_list(raw)
        .map(|path| {
            if collection.is_selectable(path) {
                Ok(path.to_string())
            } else {
                Err(QueryError::UnknownField(path.to_string()))
            }
        })
        .collect()
}

fn parse_sort(collection: Collection, raw: &str) -> Result<Vec<SortKey>, QueryError> {
    let keys = split_list(raw)
        .map(|token| {
            let key = SortKey::parse(token);
            lookup(collection, &key.path).map(|_| key)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if keys.is_empty() {
        Ok(SortKey::default_order())
    } else {
        Ok(keys)
    }
}
