//! Load a schema from a JSON file or string and resolve it.

use crate::config::resolved::{Column, Schema};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Build the resolved schema from raw config (validates first).
pub fn resolve(config: &SchemaConfig) -> Result<Schema, ConfigError> {
    validate(config)?;

    let columns = config
        .columns
        .iter()
        .map(|c| {
            ColumnType::parse(&c.type_)
                .map(|type_| Column {
                    name: c.name.clone(),
                    type_,
                })
                .ok_or_else(|| ConfigError::UnknownColumnType {
                    column: c.name.clone(),
                    type_: c.type_.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let whitelist: HashMap<String, HashSet<String>> = config
        .whitelist
        .iter()
        .map(|(scenario, keys)| (scenario.clone(), keys.iter().cloned().collect()))
        .collect();

    Ok(Schema {
        table_name: config.table_name.clone(),
        primary_key: config.primary_key.clone(),
        columns,
        whitelist,
        durability: config.durability.unwrap_or_default(),
    })
}

pub fn load_schema_str(raw: &str) -> Result<Schema, ConfigError> {
    let config: SchemaConfig = serde_json::from_str(raw)?;
    resolve(&config)
}

pub fn load_schema_file(path: impl AsRef<Path>) -> Result<Schema, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let schema = load_schema_str(&raw)?;
    tracing::debug!(path = %path.display(), table = %schema.table_name, "schema loaded");
    Ok(schema)
}
