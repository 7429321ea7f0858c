//! Schema validation: identifiers and primary key. Whitelist problems only warn.

use crate::config::{SchemaConfig, DEFAULT_SCENARIO};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static identifier pattern"))
}

/// Table and column names are spliced into statements, so they must be plain identifiers.
pub fn is_identifier(s: &str) -> bool {
    identifier_re().is_match(s)
}

pub fn validate(config: &SchemaConfig) -> Result<(), ConfigError> {
    if !is_identifier(&config.table_name) {
        return Err(ConfigError::InvalidIdentifier(config.table_name.clone()));
    }
    if !is_identifier(&config.primary_key) {
        return Err(ConfigError::InvalidIdentifier(config.primary_key.clone()));
    }
    let mut declared = HashSet::new();
    for c in &config.columns {
        if !is_identifier(&c.name) {
            return Err(ConfigError::InvalidIdentifier(c.name.clone()));
        }
        declared.insert(c.name.as_str());
    }
    if !declared.contains(config.primary_key.as_str()) {
        return Err(ConfigError::InvalidPrimaryKey {
            table: config.table_name.clone(),
            column: config.primary_key.clone(),
        });
    }

    if !config.whitelist.contains_key(DEFAULT_SCENARIO) {
        tracing::warn!(table = %config.table_name, "whitelist has no default scenario; unlisted scenarios accept no columns");
    }
    for (scenario, keys) in &config.whitelist {
        for k in keys {
            if !declared.contains(k.as_str()) {
                tracing::warn!(table = %config.table_name, scenario = %scenario, column = %k, "whitelist names an undeclared column");
            }
        }
    }
    Ok(())
}
