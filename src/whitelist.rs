//! Whitelist filter: the only path from caller-supplied maps to generated statements.

use crate::config::{Schema, DEFAULT_SCENARIO};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Caller-supplied argument or predicate map.
pub type Args = Map<String, Value>;

pub const SCENARIO_CREATE: &str = "create";
pub const SCENARIO_UPDATE: &str = "update";

/// Allowed keys for a scenario: the scenario's own set, else `default`, else none.
pub fn allowed<'a>(schema: &'a Schema, scenario: &str) -> Option<&'a HashSet<String>> {
    schema
        .whitelist
        .get(scenario)
        .or_else(|| schema.whitelist.get(DEFAULT_SCENARIO))
}

/// Keep only the entries of `args` whose keys the scenario allows. Values are untouched.
pub fn filter(schema: &Schema, args: &Args, scenario: &str) -> Args {
    let Some(keys) = allowed(schema, scenario) else {
        return Args::new();
    };
    args.iter()
        .filter(|(k, _)| keys.contains(k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
