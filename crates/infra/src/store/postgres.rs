//! Postgres-backed document store.
//!
//! All collections share one `documents` table holding JSONB bodies.
//! Filters are translated to containment (`@>`) for equality and to typed
//! comparisons on extracted paths for ranges.
//!
//! ## Error Mapping
//!
//! | PostgreSQL code | StoreError |
//! |-----------------|------------|
//! | `23505` unique violation | `DuplicateKey` |
//! | `23503` foreign key violation | `MissingParent` |
//! | anything else | `Database` |

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use devcamper_core::{
    Collection, Condition, Document, FieldKind, Filter, FilterValue, GeoPoint, Operator, ResourceId, SortKey,
};

use super::{FindOptions, ResourceStore, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresResourceStore {
    pool: PgPool,
}

impl PostgresResourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn path_segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// `{"a": {"b": leaf}}` for `a.b`.
fn nest(path: &str, leaf: Value) -> Value {
    path.rsplit('.').fold(leaf, |inner, segment| {
        let mut object = Map::new();
        object.insert(segment.to_string(), inner);
        Value::Object(object)
    })
}

fn field_kind(collection: Collection, path: &str) -> FieldKind {
    collection.field(path).map_or(FieldKind::Text, |f| f.kind)
}

fn push_contains(qb: &mut QueryBuilder<'_, Postgres>, path: &str, kind: FieldKind, value: &Value) {
    let leaf = if kind == FieldKind::TextList {
        Value::Array(vec![value.clone()])
    } else {
        value.clone()
    };
    qb.push("data @> ").push_bind(Json(nest(path, leaf)));
}

fn comparison_symbol(op: Operator) -> &'static str {
    match op {
        Operator::Gt => ">",
        Operator::Gte => ">=",
        Operator::Lt => "<",
        Operator::Lte => "<=",
        Operator::Eq | Operator::In => "=",
    }
}

fn push_compare(qb: &mut QueryBuilder<'_, Postgres>, path: &str, kind: FieldKind, op: Operator, value: &Value) {
    let symbol = comparison_symbol(op);
    match (kind, value.as_f64()) {
        (FieldKind::TextList, _) => {
            // Any element in range, as the in-memory matcher does for arrays.
            qb.push("EXISTS (SELECT 1 FROM jsonb_array_elements_text(CASE WHEN jsonb_typeof(data #> ")
                .push_bind(path_segments(path))
                .push(") = 'array' THEN data #> ")
                .push_bind(path_segments(path))
                .push(" ELSE '[]'::jsonb END) AS element(value) WHERE element.value COLLATE \"C\" ")
                .push(symbol)
                .push(" ")
                .push_bind(text_operand(value))
                .push(")");
        }
        (FieldKind::Number, Some(n)) => {
            qb.push("(CASE WHEN jsonb_typeof(data #> ")
                .push_bind(path_segments(path))
                .push(") = 'number' THEN (data #>> ")
                .push_bind(path_segments(path))
                .push(")::float8 ")
                .push(symbol)
                .push(" ")
                .push_bind(n)
                .push(" ELSE FALSE END)");
        }
        _ => {
            qb.push("(data #>> ")
                .push_bind(path_segments(path))
                .push(") COLLATE \"C\" ")
                .push(symbol)
                .push(" ")
                .push_bind(text_operand(value));
        }
    }
}

fn text_operand(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, collection: Collection, condition: &Condition) {
    let kind = field_kind(collection, &condition.path);
    match &condition.value {
        FilterValue::List(values) if values.is_empty() => {
            qb.push("FALSE");
        }
        FilterValue::List(values) => {
            qb.push("(");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_contains(qb, &condition.path, kind, value);
            }
            qb.push(")");
        }
        FilterValue::Single(value) => match condition.op {
            Operator::Eq | Operator::In => push_contains(qb, &condition.path, kind, value),
            op => push_compare(qb, &condition.path, kind, op, value),
        },
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, collection: Collection, filter: &Filter) {
    qb.push(" WHERE collection = ").push_bind(collection.name());
    for condition in filter.conditions() {
        qb.push(" AND ");
        push_condition(qb, collection, condition);
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey]) {
    qb.push(" ORDER BY ");
    for key in sort {
        qb.push("data #> ")
            .push_bind(path_segments(&key.path))
            .push(if key.descending {
                " DESC NULLS LAST, "
            } else {
                " ASC NULLS FIRST, "
            });
    }
    qb.push("seq ASC");
}

fn parent_id(collection: Collection, doc: &Document) -> Option<Uuid> {
    collection
        .parent()
        .and_then(|parent| doc.reference(parent.field))
        .map(|id| *id.as_uuid())
}

fn decode(collection: Collection, row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let Json(value): Json<Value> = row.try_get("data")?;
    Document::from_value(value).map_err(|e| StoreError::Corrupt {
        collection,
        reason: e.to_string(),
    })
}

fn map_sqlx_error(collection: Collection, doc: &Document, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => {
                return StoreError::DuplicateKey {
                    collection,
                    key: db_err.constraint().unwrap_or("unique").to_string(),
                };
            }
            Some("23503") => {
                let parent = collection
                    .parent()
                    .and_then(|p| doc.get_str(p.field))
                    .unwrap_or_default()
                    .to_string();
                return StoreError::MissingParent { collection, parent };
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl ResourceStore for PostgresResourceStore {
    #[instrument(skip(self, doc), fields(id = %doc.id()), err)]
    async fn insert(&self, collection: Collection, doc: Document) -> Result<Document, StoreError> {
        let created_at = doc.created_at().unwrap_or_else(Utc::now);
        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, parent_id, data, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(doc.id().as_uuid())
        .bind(collection.name())
        .bind(parent_id(collection, &doc))
        .bind(Json(doc.fields()))
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(collection, &doc, e))?;
        Ok(doc)
    }

    #[instrument(skip(self), err)]
    async fn get(&self, collection: Collection, id: ResourceId) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|r| decode(collection, r)).transpose()
    }

    #[instrument(skip(self, options), err)]
    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Document>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT data FROM documents");
        push_where(&mut qb, collection, &options.filter);
        push_order(&mut qb, &options.sort);
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if options.skip > 0 {
            qb.push(" OFFSET ").push_bind(i64::try_from(options.skip).unwrap_or(i64::MAX));
        }
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(|r| decode(collection, r)).collect()
    }

    #[instrument(skip(self, filter), err)]
    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS n FROM documents");
        push_where(&mut qb, collection, filter);
        let n: i64 = qb.build().fetch_one(&self.pool).await?.try_get("n")?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    #[instrument(skip(self, doc), fields(id = %doc.id()), err)]
    async fn replace(&self, collection: Collection, doc: Document) -> Result<Option<Document>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET data = $1, parent_id = $2
            WHERE collection = $3 AND id = $4
            "#,
        )
        .bind(Json(doc.fields()))
        .bind(parent_id(collection, &doc))
        .bind(collection.name())
        .bind(doc.id().as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error(collection, &doc, e))?;
        Ok((result.rows_affected() > 0).then_some(doc))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, collection: Collection, id: ResourceId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn within_radius(
        &self,
        collection: Collection,
        center: GeoPoint,
        radius: f64,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM documents
            WHERE collection = $1
              AND jsonb_typeof(data #> '{location,coordinates}') = 'array'
              AND 2 * asin(least(1.0, sqrt(
                    power(sin(radians((data #>> '{location,coordinates,1}')::float8 - $3) / 2), 2)
                  + cos(radians($3)) * cos(radians((data #>> '{location,coordinates,1}')::float8))
                  * power(sin(radians((data #>> '{location,coordinates,0}')::float8 - $2) / 2), 2)
              ))) <= $4
            ORDER BY seq ASC
            "#,
        )
        .bind(collection.name())
        .bind(center.lng)
        .bind(center.lat)
        .bind(radius)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(|r| decode(collection, r)).collect()
    }

    #[instrument(skip(self), err)]
    async fn clear(&self, collection: Collection) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1")
            .bind(collection.name())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sql(collection: Collection, filter: &Filter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT data FROM documents");
        push_where(&mut qb, collection, filter);
        qb.into_sql()
    }

    #[test]
    fn nested_paths_become_nested_objects() {
        assert_eq!(
            nest("location.city", json!("Boston")),
            json!({ "location": { "city": "Boston" } })
        );
    }

    #[test]
    fn equality_uses_containment() {
        let filter = Filter::new().eq("housing", true);
        assert_eq!(
            sql(Collection::Bootcamps, &filter),
            "SELECT data FROM documents WHERE collection = $1 AND data @> $2"
        );
    }

    #[test]
    fn numeric_ranges_cast_to_float() {
        let filter = Filter::new().compare("averageCost", Operator::Lte, 10000);
        let text = sql(Collection::Bootcamps, &filter);
        assert!(text.contains("::float8 <= $4"), "{text}");
    }

    #[test]
    fn list_ranges_compare_each_element() {
        let filter = Filter::new().compare("careers", Operator::Gt, "B");
        let text = sql(Collection::Bootcamps, &filter);
        assert!(text.contains("jsonb_array_elements_text"), "{text}");
        assert!(text.ends_with("WHERE element.value COLLATE \"C\" > $4)"), "{text}");
    }

    #[test]
    fn membership_is_a_disjunction() {
        let filter = Filter::new().one_of("careers", vec![json!("Business"), json!("UI/UX")]);
        let text = sql(Collection::Bootcamps, &filter);
        assert!(text.ends_with("(data @> $2 OR data @> $3)"), "{text}");
    }

    #[test]
    fn empty_membership_matches_nothing() {
        let filter = Filter::new().one_of("careers", vec![]);
        assert!(sql(Collection::Bootcamps, &filter).ends_with("AND FALSE"));
    }
}
