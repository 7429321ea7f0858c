//! In-process document store. Durability flags are accepted and ignored.

use crate::document::{
    ensure_key, key_string, merge_patch, plan_insert, Document, DocumentStore, Filter, TableOptions, WriteOptions,
    WriteResult,
};
use crate::error::DocumentError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

struct Table {
    primary_key: String,
    docs: BTreeMap<String, Document>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn table_list(&self) -> Result<Vec<String>, DocumentError> {
        let tables = self.tables.read().await;
        let mut names: Vec<String> = tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn table_create(&self, table: &str, options: &TableOptions) -> Result<WriteResult, DocumentError> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(table) {
            return Err(DocumentError::TableExists(table.to_string()));
        }
        tables.insert(
            table.to_string(),
            Table {
                primary_key: options.primary_key.clone(),
                docs: BTreeMap::new(),
            },
        );
        Ok(WriteResult {
            tables_created: 1,
            ..WriteResult::default()
        })
    }

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, DocumentError> {
        let tables = self.tables.read().await;
        let t = tables
            .get(table)
            .ok_or_else(|| DocumentError::TableNotFound(table.to_string()))?;
        Ok(t.docs.values().filter(|d| filter.matches(d)).cloned().collect())
    }

    async fn insert(&self, table: &str, mut doc: Document, options: &WriteOptions) -> Result<WriteResult, DocumentError> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DocumentError::TableNotFound(table.to_string()))?;
        let mut result = WriteResult::default();
        if let Some(generated) = ensure_key(&mut doc, &t.primary_key) {
            result.generated_keys.push(generated);
        }
        let key = doc
            .get(&t.primary_key)
            .map(key_string)
            .ok_or_else(|| DocumentError::Invalid("document has no primary key".into()))?;

        let existing = t.docs.get(&key).cloned();
        if let Some(write) = plan_insert(existing, doc, options, &t.primary_key, &mut result) {
            t.docs.insert(key, write);
        }
        Ok(result)
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Document,
        options: &WriteOptions,
    ) -> Result<WriteResult, DocumentError> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DocumentError::TableNotFound(table.to_string()))?;
        let mut result = WriteResult::default();
        let primary_key = t.primary_key.clone();
        for old in t.docs.values_mut().filter(|d| filter.matches(d)) {
            match merge_patch(old, patch, &primary_key) {
                Ok(Some(merged)) => {
                    let before = std::mem::replace(old, merged.clone());
                    result.replaced += 1;
                    result.record_change(options, Some(before), Some(merged));
                }
                Ok(None) => {
                    result.unchanged += 1;
                    result.record_change(options, Some(old.clone()), Some(old.clone()));
                }
                Err(e) => result.record_error(e),
            }
        }
        Ok(result)
    }

    async fn delete(&self, table: &str, filter: &Filter, options: &WriteOptions) -> Result<WriteResult, DocumentError> {
        let mut tables = self.tables.write().await;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| DocumentError::TableNotFound(table.to_string()))?;
        let mut result = WriteResult::default();
        let doomed: Vec<String> = t
            .docs
            .iter()
            .filter(|(_, d)| filter.matches(d))
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            if let Some(old) = t.docs.remove(&key) {
                result.deleted += 1;
                result.record_change(options, Some(old), None);
            }
        }
        Ok(result)
    }
}
