//! Document store on PostgreSQL: one `(key, doc JSONB)` table per collection inside a
//! dedicated schema, plus a registry recording each collection's primary key.

use crate::config::Durability;
use crate::document::{
    ensure_key, key_string, merge_patch, plan_insert, Document, DocumentStore, Filter, TableOptions, WriteOptions,
    WriteResult,
};
use crate::error::DocumentError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::RwLock;

pub const DEFAULT_NAMESPACE: &str = "docstore";
const REGISTRY_TABLE: &str = "_collections";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn into_document(v: Value) -> Result<Document, DocumentError> {
    match v {
        Value::Object(m) => Ok(m),
        other => Err(DocumentError::Invalid(format!("stored value is not an object: {}", other))),
    }
}

pub struct JsonbStore {
    pool: PgPool,
    namespace: String,
    /// Collection name to primary key; filled lazily from the registry.
    keys: RwLock<HashMap<String, String>>,
}

impl JsonbStore {
    /// Open the store and make sure its schema and registry exist.
    pub async fn open(pool: PgPool) -> Result<Self, DocumentError> {
        Self::open_in(pool, DEFAULT_NAMESPACE).await
    }

    pub async fn open_in(pool: PgPool, namespace: &str) -> Result<Self, DocumentError> {
        let store = JsonbStore {
            pool,
            namespace: namespace.to_string(),
            keys: RwLock::new(HashMap::new()),
        };
        store.ensure_registry().await?;
        Ok(store)
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.namespace), quote_ident(table))
    }

    async fn ensure_registry(&self) -> Result<(), DocumentError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&self.namespace)))
            .execute(&self.pool)
            .await?;
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                name TEXT PRIMARY KEY,
                primary_key TEXT NOT NULL,
                durability TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.qualified(REGISTRY_TABLE)
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn primary_key(&self, table: &str) -> Result<String, DocumentError> {
        if let Ok(keys) = self.keys.read() {
            if let Some(pk) = keys.get(table) {
                return Ok(pk.clone());
            }
        }
        let row: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT primary_key FROM {} WHERE name = $1",
            self.qualified(REGISTRY_TABLE)
        ))
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        let pk = row
            .map(|r| r.0)
            .ok_or_else(|| DocumentError::TableNotFound(table.to_string()))?;
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(table.to_string(), pk.clone());
        }
        Ok(pk)
    }

    /// Begin a write. Soft durability acknowledges before the WAL is flushed.
    async fn begin_write(&self, durability: Durability) -> Result<Transaction<'static, Postgres>, DocumentError> {
        let mut tx = self.pool.begin().await?;
        if durability == Durability::Soft {
            sqlx::query("SET LOCAL synchronous_commit = off")
                .execute(&mut *tx)
                .await?;
        }
        Ok(tx)
    }
}

#[async_trait]
impl DocumentStore for JsonbStore {
    async fn table_list(&self) -> Result<Vec<String>, DocumentError> {
        let rows: Vec<(String,)> = sqlx::query_as(&format!(
            "SELECT name FROM {} ORDER BY name",
            self.qualified(REGISTRY_TABLE)
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn table_create(&self, table: &str, options: &TableOptions) -> Result<WriteResult, DocumentError> {
        let mut tx = self.begin_write(options.durability).await?;
        let durability = match options.durability {
            Durability::Hard => "hard",
            Durability::Soft => "soft",
        };
        let registered: Option<(String,)> = sqlx::query_as(&format!(
            "INSERT INTO {} (name, primary_key, durability) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING RETURNING name",
            self.qualified(REGISTRY_TABLE)
        ))
        .bind(table)
        .bind(&options.primary_key)
        .bind(durability)
        .fetch_optional(&mut *tx)
        .await?;
        if registered.is_none() {
            return Err(DocumentError::TableExists(table.to_string()));
        }
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, doc JSONB NOT NULL)",
            self.qualified(table)
        );
        sqlx::query(&ddl).execute(&mut *tx).await?;
        tx.commit().await?;
        if let Ok(mut keys) = self.keys.write() {
            keys.insert(table.to_string(), options.primary_key.clone());
        }
        Ok(WriteResult {
            tables_created: 1,
            ..WriteResult::default()
        })
    }

    async fn select(&self, table: &str, filter: &Filter) -> Result<Vec<Document>, DocumentError> {
        self.primary_key(table).await?;
        let sql = format!("SELECT doc FROM {} WHERE doc @> $1 ORDER BY key", self.qualified(table));
        tracing::debug!(sql = %sql, filter = ?filter.0, "query");
        let docs: Vec<Value> = sqlx::query_scalar(&sql)
            .bind(Value::Object(filter.0.clone()))
            .fetch_all(&self.pool)
            .await?;
        docs.into_iter().map(into_document).collect()
    }

    async fn insert(&self, table: &str, mut doc: Document, options: &WriteOptions) -> Result<WriteResult, DocumentError> {
        let primary_key = self.primary_key(table).await?;
        let mut result = WriteResult::default();
        if let Some(generated) = ensure_key(&mut doc, &primary_key) {
            result.generated_keys.push(generated);
        }
        let key = doc
            .get(&primary_key)
            .map(key_string)
            .ok_or_else(|| DocumentError::Invalid("document has no primary key".into()))?;

        let qualified = self.qualified(table);
        let mut tx = self.begin_write(options.durability).await?;
        let claimed: Option<String> = sqlx::query_scalar(&format!(
            "INSERT INTO {} (key, doc) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING RETURNING key",
            qualified
        ))
        .bind(&key)
        .bind(Value::Object(doc.clone()))
        .fetch_optional(&mut *tx)
        .await?;
        if claimed.is_some() {
            plan_insert(None, doc, options, &primary_key, &mut result);
            tx.commit().await?;
            return Ok(result);
        }

        // The key is taken, possibly by a concurrent insert that committed first.
        let existing: Option<Value> = sqlx::query_scalar(&format!("SELECT doc FROM {} WHERE key = $1 FOR UPDATE", qualified))
            .bind(&key)
            .fetch_optional(&mut *tx)
            .await?;
        match existing.map(into_document).transpose()? {
            Some(old) => {
                if let Some(write) = plan_insert(Some(old), doc, options, &primary_key, &mut result) {
                    sqlx::query(&format!("UPDATE {} SET doc = $2 WHERE key = $1", qualified))
                        .bind(&key)
                        .bind(Value::Object(write))
                        .execute(&mut *tx)
                        .await?;
                }
            }
            None => result.record_error(format!("document `{}` was removed during insert", key)),
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: &Document,
        options: &WriteOptions,
    ) -> Result<WriteResult, DocumentError> {
        let primary_key = self.primary_key(table).await?;
        let qualified = self.qualified(table);
        let mut tx = self.begin_write(options.durability).await?;
        let matched: Vec<(String, Value)> = sqlx::query_as(&format!(
            "SELECT key, doc FROM {} WHERE doc @> $1 ORDER BY key FOR UPDATE",
            qualified
        ))
        .bind(Value::Object(filter.0.clone()))
        .fetch_all(&mut *tx)
        .await?;

        let mut result = WriteResult::default();
        for (key, doc) in matched {
            let old = into_document(doc)?;
            match merge_patch(&old, patch, &primary_key) {
                Ok(Some(merged)) => {
                    sqlx::query(&format!("UPDATE {} SET doc = $2 WHERE key = $1", qualified))
                        .bind(&key)
                        .bind(Value::Object(merged.clone()))
                        .execute(&mut *tx)
                        .await?;
                    result.replaced += 1;
                    result.record_change(options, Some(old), Some(merged));
                }
                Ok(None) => {
                    result.unchanged += 1;
                    result.record_change(options, Some(old.clone()), Some(old));
                }
                Err(e) => result.record_error(e),
            }
        }
        tx.commit().await?;
        Ok(result)
    }

    async fn delete(&self, table: &str, filter: &Filter, options: &WriteOptions) -> Result<WriteResult, DocumentError> {
        self.primary_key(table).await?;
        let mut tx = self.begin_write(options.durability).await?;
        let removed: Vec<Value> = sqlx::query_scalar(&format!(
            "DELETE FROM {} WHERE doc @> $1 RETURNING doc",
            self.qualified(table)
        ))
        .bind(Value::Object(filter.0.clone()))
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut result = WriteResult::default();
        for doc in removed {
            result.deleted += 1;
            result.record_change(options, Some(into_document(doc)?), None);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Conflict, ReturnChanges};
    use serde_json::json;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    /// Runs against a live server only when `DOCSTORE_TEST_URL` is set.
    async fn store() -> Option<JsonbStore> {
        let url = std::env::var("DOCSTORE_TEST_URL").ok()?;
        let pool = PgPoolOptions::new().max_connections(4).connect(&url).await.unwrap();
        let namespace = format!("docstore_test_{}", uuid::Uuid::new_v4().simple());
        Some(JsonbStore::open_in(pool, &namespace).await.unwrap())
    }

    #[tokio::test]
    async fn concurrent_duplicate_inserts_are_counted() {
        let Some(store) = store().await else {
            return;
        };
        store
            .table_create("widgets", &TableOptions { primary_key: "id".into(), durability: Durability::Hard })
            .await
            .unwrap();
        let store = Arc::new(store);
        let options = WriteOptions {
            durability: Durability::Hard,
            return_changes: ReturnChanges::Always,
            conflict: Conflict::Error,
        };
        let doc = json!({"id": "k1", "name": "a"}).as_object().cloned().unwrap();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let (store, doc) = (store.clone(), doc.clone());
            handles.push(tokio::spawn(async move { store.insert("widgets", doc, &options).await }));
        }
        let mut inserted = 0;
        let mut errors = 0;
        for h in handles {
            let r = h.await.unwrap().unwrap();
            inserted += r.inserted;
            errors += r.errors;
        }
        assert_eq!((inserted, errors), (1, 7));
        sqlx::query(&format!("DROP SCHEMA {} CASCADE", quote_ident(&store.namespace)))
            .execute(&store.pool)
            .await
            .unwrap();
    }
}
