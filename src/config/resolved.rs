//! Resolved schema: validated and flattened for runtime use. Immutable once built.

use crate::config::{ColumnType, Durability};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Whitelist scenario that every other scenario falls back to.
pub const DEFAULT_SCENARIO: &str = "default";

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub type_: ColumnType,
}

#[derive(Clone, Debug)]
pub struct Schema {
    pub table_name: String,
    pub primary_key: String,
    /// Declared columns in file order.
    pub columns: Vec<Column>,
    pub whitelist: HashMap<String, HashSet<String>>,
    pub durability: Durability,
}

impl Schema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column(name).map(|c| c.type_)
    }

    /// `<table>_created`
    pub fn created_column(&self) -> String {
        format!("{}_created", self.table_name)
    }

    /// `<table>_updated`
    pub fn updated_column(&self) -> String {
        format!("{}_updated", self.table_name)
    }

    /// Convert a loosely typed value (e.g. a path segment) to the declared column type.
    /// Values that do not parse are passed through unchanged.
    pub fn coerce(&self, column: &str, value: &Value) -> Value {
        let Some(type_) = self.column_type(column) else {
            return value.clone();
        };
        let Value::String(s) = value else {
            return value.clone();
        };
        if type_.is_integer() {
            if let Ok(n) = s.trim().parse::<i64>() {
                return Value::Number(n.into());
            }
        } else if type_.is_float() {
            if let Some(n) = s.trim().parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                return Value::Number(n);
            }
        } else if type_ == ColumnType::Boolean {
            if s.eq_ignore_ascii_case("true") {
                return Value::Bool(true);
            }
            if s.eq_ignore_ascii_case("false") {
                return Value::Bool(false);
            }
        }
        value.clone()
    }
}
