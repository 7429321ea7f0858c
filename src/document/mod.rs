//! Document store seam: filter/mutate semantics with change records.
//!
//! Writes never fail for per-document problems (duplicate keys, key rewrites);
//! those are counted in `WriteResult::errors` with the first message kept,
//! and only store-level failures come back as `Err`.

pub mod jsonb;
pub mod memory;
pub mod query;

pub use jsonb::JsonbStore;
pub use memory::MemoryStore;
pub use query::{DocAction, DocQuery, DocResponse};

use crate::config::Durability;
use crate::error::DocumentError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

/// Field-equality filter. An empty filter matches every document.
///
/// Numbers compare by value, so `2` matches `2.0`. A `null` in the filter only
/// matches a field stored as `null`; a missing field matches nothing. Both rules
/// follow JSONB containment (`@>`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter(pub Map<String, Value>);

impl Filter {
    pub fn all() -> Self {
        Filter(Map::new())
    }

    pub fn eq(field: &str, value: Value) -> Self {
        let mut m = Map::new();
        m.insert(field.to_string(), value);
        Filter(m)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.0
            .iter()
            .all(|(k, v)| doc.get(k).is_some_and(|stored| same_value(stored, v)))
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReturnChanges {
    #[default]
    Never,
    Always,
}

/// What an insert does when the primary key already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Conflict {
    #[default]
    Error,
    Replace,
    Update,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub durability: Durability,
    pub return_changes: ReturnChanges,
    pub conflict: Conflict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableOptions {
    pub primary_key: String,
    pub durability: Durability,
}

/// Before/after pair for one written document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Change {
    pub old_val: Option<Document>,
    pub new_val: Option<Document>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WriteResult {
    pub inserted: u64,
    pub replaced: u64,
    pub unchanged: u64,
    pub deleted: u64,
    pub skipped: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub generated_keys: Vec<String>,
    pub tables_created: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
}

impl WriteResult {
    pub(crate) fn record_error(&mut self, message: impl Into<String>) {
        self.errors += 1;
        if self.first_error.is_none() {
            self.first_error = Some(message.into());
        }
    }

    pub(crate) fn record_change(&mut self, options: &WriteOptions, old_val: Option<Document>, new_val: Option<Document>) {
        if options.return_changes == ReturnChanges::Always {
            self.changes.push(Change { old_val, new_val });
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn table_list(&self) -> Result<Vec<String>, DocumentError>;

    async fn table_create(&self, table: &str, options: &TableOptions) -> Result<WriteResult, DocumentError>;

    /// Every matching document, materialized.
    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, DocumentError>;

    async fn insert(&self, table: &str, doc: Document, options: &WriteOptions) -> Result<WriteResult, DocumentError>;

    /// Merge `patch` into every matching document.
    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Document,
        options: &WriteOptions,
    ) -> Result<WriteResult, DocumentError>;

    async fn delete(&self, table: &str, filter: &Filter, options: &WriteOptions) -> Result<WriteResult, DocumentError>;
}

/// Stable string form of a primary key value, used as the storage key.
pub(crate) fn key_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Fill in a generated UUID when the document has no primary key. Returns the generated key, if any.
pub(crate) fn ensure_key(doc: &mut Document, primary_key: &str) -> Option<String> {
    match doc.get(primary_key) {
        Some(v) if !v.is_null() => None,
        _ => {
            let key = uuid::Uuid::new_v4().to_string();
            doc.insert(primary_key.to_string(), Value::String(key.clone()));
            Some(key)
        }
    }
}

/// Shallow merge of `patch` into `old`. `Ok(None)` when nothing changes;
/// `Err` when the patch would rewrite the primary key.
pub(crate) fn merge_patch(old: &Document, patch: &Document, primary_key: &str) -> Result<Option<Document>, String> {
    if let Some(new_key) = patch.get(primary_key) {
        if old.get(primary_key) != Some(new_key) {
            return Err(format!("primary key {} cannot be changed", primary_key));
        }
    }
    let mut merged = old.clone();
    for (k, v) in patch {
        merged.insert(k.clone(), v.clone());
    }
    if merged == *old {
        Ok(None)
    } else {
        Ok(Some(merged))
    }
}

/// Decide what an insert writes given the document already stored under its key.
/// Counts go into `result`; `None` means nothing is written.
pub(crate) fn plan_insert(
    existing: Option<Document>,
    doc: Document,
    options: &WriteOptions,
    primary_key: &str,
    result: &mut WriteResult,
) -> Option<Document> {
    let Some(old) = existing else {
        result.inserted += 1;
        result.record_change(options, None, Some(doc.clone()));
        return Some(doc);
    };
    match options.conflict {
        Conflict::Error => {
            result.record_error(format!("Duplicate primary key `{}`", primary_key));
            None
        }
        Conflict::Replace => {
            if old == doc {
                result.unchanged += 1;
                result.record_change(options, Some(old), Some(doc));
                return None;
            }
            result.replaced += 1;
            result.record_change(options, Some(old), Some(doc.clone()));
            Some(doc)
        }
        Conflict::Update => match merge_patch(&old, &doc, primary_key) {
            Ok(Some(merged)) => {
                result.replaced += 1;
                result.record_change(options, Some(old), Some(merged.clone()));
                Some(merged)
            }
            Ok(None) => {
                result.unchanged += 1;
                result.record_change(options, Some(old.clone()), Some(old));
                None
            }
            Err(e) => {
                result.record_error(e);
                None
            }
        },
    }
}
