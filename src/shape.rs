//! Result shaping: SQL rows and document change records both become `Rows`.

use crate::config::Schema;
use crate::document::{Document, WriteResult};
use serde_json::{Map, Value};

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;
pub type Rows = Vec<Row>;

/// Decode a PostgreSQL row. Timestamps come back as epoch seconds.
pub fn row_to_json(row: &sqlx::postgres::PgRow) -> Row {
    use sqlx::Column;
    use sqlx::Row as _;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn epoch_seconds(millis: i64) -> Value {
    serde_json::Number::from_f64(millis as f64 / 1000.0)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn cell_to_value(row: &sqlx::postgres::PgRow, name: &str) -> Value {
    use sqlx::Row as _;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return epoch_seconds(d.timestamp_millis());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return epoch_seconds(d.and_utc().timestamp_millis());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(t)) = row.try_get::<Option<chrono::NaiveTime>, _>(name) {
        return Value::String(t.format("%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

/// Restrict a document to the declared columns (primary key always kept).
/// Schemas without declared columns pass documents through whole.
pub fn project(schema: &Schema, doc: Document) -> Row {
    if schema.columns.is_empty() {
        return doc;
    }
    doc.into_iter()
        .filter(|(k, _)| *k == schema.primary_key || schema.has_column(k))
        .collect()
}

pub fn project_all(schema: &Schema, docs: Vec<Document>) -> Rows {
    docs.into_iter().map(|d| project(schema, d)).collect()
}

/// New values of the change records that wrote something, in order.
/// Deletions (null new value) and unchanged documents are skipped.
pub fn rows_from_changes(schema: &Schema, result: WriteResult) -> Rows {
    result
        .changes
        .into_iter()
        .filter(|c| c.old_val != c.new_val)
        .filter_map(|c| c.new_val)
        .map(|d| project(schema, d))
        .collect()
}
