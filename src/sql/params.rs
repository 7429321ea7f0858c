//! Convert serde_json::Value to values sqlx can bind, and render typed placeholders.

use crate::config::ColumnType;
use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a PostgreSQL statement. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Json(Value),
}

impl BindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, BindValue::I64(_) | BindValue::F64(_))
    }
}

/// Placeholder for parameter `n`, cast to the column's type when it is known.
/// Numbers bound to temporal columns are epoch seconds and go through `to_timestamp`.
pub fn placeholder(n: usize, column_type: Option<ColumnType>, value: &BindValue) -> String {
    match column_type {
        Some(t) if t.is_temporal() && value.is_number() => {
            let ts = format!("to_timestamp(${}::double precision)", n);
            if t == ColumnType::Date {
                format!("{}::date", ts)
            } else {
                ts
            }
        }
        Some(t) => format!("${}::{}", n, t.pg_cast()),
        None => format!("${}", n),
    }
}

/// Bind every parameter in order.
pub fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(*b),
            BindValue::I64(n) => query.bind(*n),
            BindValue::F64(n) => query.bind(*n),
            BindValue::Text(s) => query.bind(s.clone()),
            BindValue::Json(v) => query.bind(v.clone()),
        };
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_map_to_bind_values() {
        assert_eq!(BindValue::from_json(&json!(null)), BindValue::Null);
        assert_eq!(BindValue::from_json(&json!(3)), BindValue::I64(3));
        assert_eq!(BindValue::from_json(&json!(1.25)), BindValue::F64(1.25));
        assert_eq!(BindValue::from_json(&json!("a")), BindValue::Text("a".into()));
        assert_eq!(BindValue::from_json(&json!({"a": 1})), BindValue::Json(json!({"a": 1})));
    }

    #[test]
    fn placeholders_cast_by_column_type() {
        assert_eq!(placeholder(1, Some(ColumnType::Integer), &BindValue::I64(1)), "$1::integer");
        assert_eq!(placeholder(2, None, &BindValue::Text("x".into())), "$2");
        assert_eq!(
            placeholder(3, Some(ColumnType::Timestamp), &BindValue::F64(1.5)),
            "to_timestamp($3::double precision)"
        );
        assert_eq!(
            placeholder(4, Some(ColumnType::Timestamp), &BindValue::Text("2024-01-01".into())),
            "$4::timestamptz"
        );
        assert_eq!(
            placeholder(5, Some(ColumnType::Date), &BindValue::I64(0)),
            "to_timestamp($5::double precision)::date"
        );
    }
}
