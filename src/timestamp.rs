//! `<table>_created` / `<table>_updated` stamping for the relational strategy.

use crate::config::Schema;
use crate::whitelist::Args;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stamp {
    Created,
    Updated,
}

/// Current time as epoch seconds with millisecond precision.
pub fn now_epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

pub fn inject(schema: &Schema, args: Args, stamp: Stamp) -> Args {
    inject_at(schema, args, stamp, now_epoch_seconds())
}

/// Set the stamp column to `at` when the schema declares it; otherwise return `args` unchanged.
pub fn inject_at(schema: &Schema, mut args: Args, stamp: Stamp, at: f64) -> Args {
    let column = match stamp {
        Stamp::Created => schema.created_column(),
        Stamp::Updated => schema.updated_column(),
    };
    if schema.has_column(&column) {
        if let Some(n) = serde_json::Number::from_f64(at) {
            args.insert(column, Value::Number(n));
        }
    }
    args
}
