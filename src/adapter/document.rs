//! Document-store strategy: filter plus mutation against a `DocumentStore`.
//!
//! Writes are durable and ask for change records. `create` and `delete` treat a
//! write that touched nothing as an error; `update` reports it as an empty row set.

use crate::adapter::CrudAdapter;
use crate::config::{Schema, DEFAULT_SCENARIO};
use crate::document::query::{self, DocQuery};
use crate::document::{DocResponse, Document, DocumentStore, Filter, TableOptions, WriteResult};
use crate::error::{AppError, DocumentError};
use crate::shape::{project_all, rows_from_changes, Rows};
use crate::timestamp::{self, Stamp};
use crate::whitelist::{self, Args, SCENARIO_CREATE, SCENARIO_UPDATE};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub struct DocumentAdapter {
    store: Arc<dyn DocumentStore>,
    schema: Arc<Schema>,
}

impl DocumentAdapter {
    pub fn new(store: Arc<dyn DocumentStore>, schema: Arc<Schema>) -> Self {
        DocumentAdapter { store, schema }
    }

    async fn documents(&self, q: DocQuery) -> Result<Rows, AppError> {
        match q.run(self.store.as_ref()).await? {
            DocResponse::Documents(docs) => Ok(project_all(&self.schema, docs)),
            DocResponse::Write(_) => Err(unexpected("read", "write result")),
        }
    }

    async fn write(&self, q: DocQuery) -> Result<WriteResult, AppError> {
        match q.run(self.store.as_ref()).await? {
            DocResponse::Write(result) => Ok(result),
            DocResponse::Documents(_) => Err(unexpected("write", "documents")),
        }
    }

    fn mutating_filter(&self, predicate: &Args, operation: &'static str) -> Result<Filter, AppError> {
        let filtered = whitelist::filter(&self.schema, predicate, DEFAULT_SCENARIO);
        if filtered.is_empty() {
            return Err(AppError::EmptyPredicate(operation));
        }
        Ok(query::predicate_filter(&self.schema, &filtered))
    }

    fn update_patch(&self, args: &Args) -> Document {
        let patch = whitelist::filter(&self.schema, args, SCENARIO_UPDATE);
        timestamp::inject(&self.schema, patch, Stamp::Updated)
    }

    /// Rows for the documents an update actually rewrote.
    fn replaced_rows(&self, result: WriteResult) -> Rows {
        if result.replaced == 0 {
            return Rows::new();
        }
        rows_from_changes(&self.schema, result)
    }

    async fn remove(&self, filter: Filter, operation: &'static str) -> Result<(), AppError> {
        let result = self.write(query::delete(&self.schema, filter)).await?;
        if result.deleted == 0 {
            return Err(AppError::NoRowsAffected { operation, result });
        }
        Ok(())
    }
}

fn unexpected(expected: &str, got: &str) -> AppError {
    AppError::Document(DocumentError::Invalid(format!(
        "{} query answered with {}",
        expected, got
    )))
}

#[async_trait]
impl CrudAdapter for DocumentAdapter {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn setup(&self) -> Result<(), AppError> {
        let table = &self.schema.table_name;
        tracing::info!(table = %table, "[_setup] checking for table");
        let existing = self.store.table_list().await?;
        if existing.iter().any(|t| t == table) {
            tracing::info!(table = %table, "[_setup] table already exists");
            return Ok(());
        }
        let options = TableOptions {
            primary_key: self.schema.primary_key.clone(),
            durability: self.schema.durability,
        };
        tracing::info!(table = %table, primary_key = %options.primary_key, "[_setup] creating table");
        match self.store.table_create(table, &options).await {
            Ok(_) => {
                tracing::info!(table = %table, "[_setup] table created");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "[_setup] failed creating table");
                Err(e.into())
            }
        }
    }

    async fn create(&self, args: Args) -> Result<Rows, AppError> {
        let doc = whitelist::filter(&self.schema, &args, SCENARIO_CREATE);
        let doc = timestamp::inject(&self.schema, doc, Stamp::Created);
        let result = self.write(query::insert(&self.schema, doc)).await?;
        if result.inserted == 0 {
            return Err(AppError::NoRowsAffected {
                operation: "create",
                result,
            });
        }
        Ok(rows_from_changes(&self.schema, result).into_iter().take(1).collect())
    }

    async fn get(&self, id: &Value) -> Result<Rows, AppError> {
        self.documents(query::select(&self.schema, query::key_filter(&self.schema, id)))
            .await
    }

    async fn get_all(&self) -> Result<Rows, AppError> {
        self.documents(query::select(&self.schema, Filter::all())).await
    }

    async fn get_all_where(&self, predicate: Args) -> Result<Rows, AppError> {
        let filtered = whitelist::filter(&self.schema, &predicate, DEFAULT_SCENARIO);
        let filter = query::predicate_filter(&self.schema, &filtered);
        self.documents(query::select(&self.schema, filter)).await
    }

    async fn update(&self, id: &Value, args: Args) -> Result<Rows, AppError> {
        let filter = query::key_filter(&self.schema, id);
        let q = query::update(&self.schema, filter, self.update_patch(&args));
        let result = self.write(q).await?;
        Ok(self.replaced_rows(result).into_iter().take(1).collect())
    }

    async fn update_where(&self, predicate: Args, args: Args) -> Result<Rows, AppError> {
        let filter = self.mutating_filter(&predicate, "updateWhere")?;
        let q = query::update(&self.schema, filter, self.update_patch(&args));
        let result = self.write(q).await?;
        Ok(self.replaced_rows(result))
    }

    async fn delete(&self, id: &Value) -> Result<(), AppError> {
        self.remove(query::key_filter(&self.schema, id), "delete").await
    }

    async fn delete_where(&self, predicate: Args) -> Result<(), AppError> {
        let filter = self.mutating_filter(&predicate, "deleteWhere")?;
        self.remove(filter, "deleteWhere").await
    }
}
