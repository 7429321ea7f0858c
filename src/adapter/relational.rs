//! Relational strategy: SQL built from the schema, executed on a PostgreSQL pool.

use crate::adapter::CrudAdapter;
use crate::config::{Schema, DEFAULT_SCENARIO};
use crate::error::AppError;
use crate::shape::{row_to_json, Rows};
use crate::sql::{self, bind_params, Statement};
use crate::timestamp::{self, Stamp};
use crate::whitelist::{self, Args, SCENARIO_CREATE, SCENARIO_UPDATE};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

pub struct RelationalAdapter {
    pool: PgPool,
    schema: Arc<Schema>,
}

impl RelationalAdapter {
    pub fn new(pool: PgPool, schema: Arc<Schema>) -> Self {
        RelationalAdapter { pool, schema }
    }

    fn key_predicate(&self, id: &Value) -> Args {
        let mut m = Args::new();
        m.insert(self.schema.primary_key.clone(), id.clone());
        m
    }

    /// Whitelisted predicate for a mutating *Where operation; refuses to match everything.
    fn mutating_predicate(&self, predicate: &Args, operation: &'static str) -> Result<Args, AppError> {
        let filtered = whitelist::filter(&self.schema, predicate, DEFAULT_SCENARIO);
        if filtered.is_empty() {
            return Err(AppError::EmptyPredicate(operation));
        }
        Ok(filtered)
    }

    async fn query_rows(&self, q: &Statement) -> Result<Rows, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &Statement) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_params(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn update_values(&self, args: &Args) -> Args {
        let values = whitelist::filter(&self.schema, args, SCENARIO_UPDATE);
        timestamp::inject(&self.schema, values, Stamp::Updated)
    }

    pub(crate) fn create_statement(&self, args: &Args) -> Statement {
        let values = whitelist::filter(&self.schema, args, SCENARIO_CREATE);
        let values = timestamp::inject(&self.schema, values, Stamp::Created);
        sql::insert(&self.schema, &values)
    }

    pub(crate) fn get_all_where_statement(&self, predicate: &Args) -> Statement {
        let filtered = whitelist::filter(&self.schema, predicate, DEFAULT_SCENARIO);
        sql::select(&self.schema, &filtered)
    }

    pub(crate) fn update_statement(&self, id: &Value, args: &Args) -> Statement {
        sql::update(&self.schema, &self.key_predicate(id), &self.update_values(args))
    }

    pub(crate) fn update_where_statement(&self, predicate: &Args, args: &Args) -> Result<Statement, AppError> {
        let filter = self.mutating_predicate(predicate, "updateWhere")?;
        Ok(sql::update(&self.schema, &filter, &self.update_values(args)))
    }

    pub(crate) fn delete_where_statement(&self, predicate: &Args) -> Result<Statement, AppError> {
        let filter = self.mutating_predicate(predicate, "deleteWhere")?;
        Ok(sql::delete(&self.schema, &filter))
    }
}

#[async_trait]
impl CrudAdapter for RelationalAdapter {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn setup(&self) -> Result<(), AppError> {
        let table = &self.schema.table_name;
        tracing::info!(table = %table, "[_setup] conditionally creating table");
        for c in &self.schema.columns {
            tracing::info!(table = %table, column = %c.name, type_ = ?c.type_, "[_setup] column");
        }
        let q = sql::create_table(&self.schema);
        match self.execute(&q).await {
            Ok(_) => {
                tracing::info!(table = %table, "[_setup] table verified to exist");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "[_setup] failed creating table");
                Err(e)
            }
        }
    }

    async fn create(&self, args: Args) -> Result<Rows, AppError> {
        self.query_rows(&self.create_statement(&args)).await
    }

    async fn get(&self, id: &Value) -> Result<Rows, AppError> {
        self.query_rows(&sql::select(&self.schema, &self.key_predicate(id))).await
    }

    async fn get_all(&self) -> Result<Rows, AppError> {
        self.query_rows(&sql::select(&self.schema, &Args::new())).await
    }

    async fn get_all_where(&self, predicate: Args) -> Result<Rows, AppError> {
        self.query_rows(&self.get_all_where_statement(&predicate)).await
    }

    async fn update(&self, id: &Value, args: Args) -> Result<Rows, AppError> {
        self.query_rows(&self.update_statement(id, &args)).await
    }

    async fn update_where(&self, predicate: Args, args: Args) -> Result<Rows, AppError> {
        let q = self.update_where_statement(&predicate, &args)?;
        self.query_rows(&q).await
    }

    /// Deleting a missing id is not an error here.
    async fn delete(&self, id: &Value) -> Result<(), AppError> {
        self.execute(&sql::delete(&self.schema, &self.key_predicate(id)))
            .await?;
        Ok(())
    }

    async fn delete_where(&self, predicate: Args) -> Result<(), AppError> {
        let q = self.delete_where_statement(&predicate)?;
        self.execute(&q).await?;
        Ok(())
    }
}
