//! Document-store statements: filter plus mutation plus write options, built from a schema.

use crate::config::{Durability, Schema};
use crate::document::{Conflict, Document, DocumentStore, Filter, ReturnChanges, WriteOptions, WriteResult};
use crate::error::DocumentError;
use crate::whitelist::Args;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum DocAction {
    Select,
    Insert(Document),
    Update(Document),
    Delete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocQuery {
    pub table: String,
    pub filter: Filter,
    pub action: DocAction,
    pub options: WriteOptions,
}

#[derive(Debug)]
pub enum DocResponse {
    Documents(Vec<Document>),
    Write(WriteResult),
}

impl DocQuery {
    pub async fn run(&self, store: &dyn DocumentStore) -> Result<DocResponse, DocumentError> {
        tracing::debug!(table = %self.table, filter = ?self.filter.0, action = ?self.action, "document query");
        Ok(match &self.action {
            DocAction::Select => DocResponse::Documents(store.select(&self.table, &self.filter).await?),
            DocAction::Insert(doc) => DocResponse::Write(store.insert(&self.table, doc.clone(), &self.options).await?),
            DocAction::Update(patch) => {
                DocResponse::Write(store.update(&self.table, &self.filter, patch, &self.options).await?)
            }
            DocAction::Delete => DocResponse::Write(store.delete(&self.table, &self.filter, &self.options).await?),
        })
    }
}

/// Filter on the primary key, with the id coerced to the key column's type.
pub fn key_filter(schema: &Schema, id: &Value) -> Filter {
    Filter::eq(&schema.primary_key, schema.coerce(&schema.primary_key, id))
}

/// Filter from an already whitelisted predicate map, values coerced by column type.
pub fn predicate_filter(schema: &Schema, predicate: &Args) -> Filter {
    Filter(
        predicate
            .iter()
            .map(|(k, v)| (k.clone(), schema.coerce(k, v)))
            .collect(),
    )
}

pub fn select(schema: &Schema, filter: Filter) -> DocQuery {
    DocQuery {
        table: schema.table_name.clone(),
        filter,
        action: DocAction::Select,
        options: WriteOptions::default(),
    }
}

/// Insert with hard durability, change records, and duplicate keys as errors.
pub fn insert(schema: &Schema, doc: Document) -> DocQuery {
    DocQuery {
        table: schema.table_name.clone(),
        filter: Filter::all(),
        action: DocAction::Insert(doc),
        options: WriteOptions {
            durability: Durability::Hard,
            return_changes: ReturnChanges::Always,
            conflict: Conflict::Error,
        },
    }
}

pub fn update(schema: &Schema, filter: Filter, patch: Document) -> DocQuery {
    DocQuery {
        table: schema.table_name.clone(),
        filter,
        action: DocAction::Update(patch),
        options: WriteOptions {
            durability: Durability::Hard,
            return_changes: ReturnChanges::Always,
            ..WriteOptions::default()
        },
    }
}

pub fn delete(schema: &Schema, filter: Filter) -> DocQuery {
    DocQuery {
        table: schema.table_name.clone(),
        filter,
        action: DocAction::Delete,
        options: WriteOptions {
            durability: Durability::Hard,
            return_changes: ReturnChanges::Never,
            ..WriteOptions::default()
        },
    }
}
