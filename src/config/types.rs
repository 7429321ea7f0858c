//! Raw schema types matching the per-resource schema JSON file.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Column type vocabulary, named after the query-builder column helpers
/// (`increments`, `string`, `timestamp`, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnType {
    Increments,
    BigIncrements,
    Integer,
    BigInteger,
    String,
    Text,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Time,
    Json,
    Jsonb,
    Uuid,
}

impl ColumnType {
    /// Parse a vocabulary name. Matching ignores case and underscores so
    /// `bigInteger`, `big_integer` and `BIGINTEGER` are the same type.
    pub fn parse(name: &str) -> Option<Self> {
        let norm: String = name
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        Some(match norm.as_str() {
            "increments" | "serial" => ColumnType::Increments,
            "bigincrements" | "bigserial" => ColumnType::BigIncrements,
            "integer" | "int" => ColumnType::Integer,
            "biginteger" | "bigint" => ColumnType::BigInteger,
            "string" | "varchar" => ColumnType::String,
            "text" => ColumnType::Text,
            "float" | "real" => ColumnType::Float,
            "double" => ColumnType::Double,
            "decimal" | "numeric" => ColumnType::Decimal,
            "boolean" | "bool" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "datetime" => ColumnType::DateTime,
            "timestamp" | "timestamptz" => ColumnType::Timestamp,
            "time" => ColumnType::Time,
            "json" => ColumnType::Json,
            "jsonb" => ColumnType::Jsonb,
            "uuid" => ColumnType::Uuid,
            _ => return None,
        })
    }

    /// PostgreSQL type used for placeholder casts.
    pub fn pg_cast(self) -> &'static str {
        match self {
            ColumnType::Increments | ColumnType::Integer => "integer",
            ColumnType::BigIncrements | ColumnType::BigInteger => "bigint",
            ColumnType::String => "varchar",
            ColumnType::Text => "text",
            ColumnType::Float => "real",
            ColumnType::Double => "double precision",
            ColumnType::Decimal => "numeric",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime | ColumnType::Timestamp => "timestamptz",
            ColumnType::Time => "time",
            ColumnType::Json => "json",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Uuid => "uuid",
        }
    }

    /// Column definition used by `CREATE TABLE`.
    pub fn pg_definition(self) -> &'static str {
        match self {
            ColumnType::Increments => "SERIAL PRIMARY KEY",
            ColumnType::BigIncrements => "BIGSERIAL PRIMARY KEY",
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Float => "REAL",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Decimal => "NUMERIC(8, 2)",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::DateTime | ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Time => "TIME",
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInteger => "BIGINT",
            ColumnType::Text => "TEXT",
            ColumnType::Json => "JSON",
            ColumnType::Jsonb => "JSONB",
            ColumnType::Uuid => "UUID",
        }
    }

    /// Serial types declare their own primary key constraint.
    pub fn is_serial(self) -> bool {
        matches!(self, ColumnType::Increments | ColumnType::BigIncrements)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::Increments | ColumnType::BigIncrements | ColumnType::Integer | ColumnType::BigInteger
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, ColumnType::Float | ColumnType::Double)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, ColumnType::DateTime | ColumnType::Timestamp | ColumnType::Date)
    }
}

/// One `[name, type]` pair from the schema file.
#[derive(Clone, Debug, Serialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
}

impl<'de> Deserialize<'de> for ColumnConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;
        match v {
            serde_json::Value::Array(items) => match items.as_slice() {
                [serde_json::Value::String(name), serde_json::Value::String(type_)] => Ok(ColumnConfig {
                    name: name.clone(),
                    type_: type_.clone(),
                }),
                _ => Err(serde::de::Error::custom(
                    "column must be a [name, type] pair of strings",
                )),
            },
            serde_json::Value::Object(mut obj) => {
                let name = obj.remove("name").and_then(|n| n.as_str().map(String::from));
                let type_ = obj.remove("type").and_then(|t| t.as_str().map(String::from));
                match (name, type_) {
                    (Some(name), Some(type_)) => Ok(ColumnConfig { name, type_ }),
                    _ => Err(serde::de::Error::custom(
                        "column object must have string \"name\" and \"type\"",
                    )),
                }
            }
            _ => Err(serde::de::Error::custom(
                "column must be a [name, type] pair or {\"name\", \"type\"} object",
            )),
        }
    }
}

/// Write durability requested from the document store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    #[default]
    Hard,
    Soft,
}

/// Schema file as stored on disk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaConfig {
    pub table_name: String,
    pub primary_key: String,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    /// Scenario name (`create`, `update`, `default`, ...) to allowed column names.
    #[serde(default)]
    pub whitelist: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub durability: Option<Durability>,
}
