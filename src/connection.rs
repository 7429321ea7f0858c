//! Connection provider: opens whichever backend the settings select.

use crate::config::{BackendKind, ConnectionSettings, Settings};
use crate::document::{DocumentStore, JsonbStore, MemoryStore};
use crate::error::{AppError, ConfigError};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::sync::Arc;

/// An opened backend, shared by every module built from it.
#[derive(Clone)]
pub enum Backend {
    Relational(PgPool),
    Document(Arc<dyn DocumentStore>),
}

impl Backend {
    pub async fn connect(settings: &Settings) -> Result<Self, AppError> {
        match settings.backend {
            BackendKind::Relational => {
                let pool = connect_pool(&settings.relational, settings.max_connections).await?;
                tracing::info!(host = %settings.relational.host, "relational backend connected");
                Ok(Backend::Relational(pool))
            }
            BackendKind::Document => {
                let pool = connect_pool(&settings.document, settings.max_connections).await?;
                let store = JsonbStore::open(pool).await?;
                tracing::info!(host = %settings.document.host, "document backend connected");
                Ok(Backend::Document(Arc::new(store)))
            }
            BackendKind::Memory => {
                tracing::info!("in-memory document backend");
                Ok(Backend::memory())
            }
        }
    }

    pub fn memory() -> Self {
        Backend::Document(Arc::new(MemoryStore::new()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Relational(_) => "relational",
            Backend::Document(_) => "document",
        }
    }
}

/// Create the target database if missing, then open a pool on it.
pub async fn connect_pool(conn: &ConnectionSettings, max_connections: u32) -> Result<PgPool, AppError> {
    let url = conn.url();
    ensure_database_exists(&url).await?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await?;
    Ok(pool)
}

/// Connects to the server's `postgres` database and issues `CREATE DATABASE` when the target is absent.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = PgConnectOptions::from_str(&admin_url)
        .map_err(|e| ConfigError::Settings(format!("invalid database url: {}", e)))?;
    let mut conn = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

/// Split `postgres://.../name?opts` into (url of the `postgres` database, `name`).
fn split_database_url(url: &str) -> Result<(String, String), ConfigError> {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    let slash = url[after_scheme..]
        .find('/')
        .map(|i| after_scheme + i + 1)
        .ok_or_else(|| ConfigError::Settings("database url has no database path".into()))?;
    let db_name = url[slash..].split('?').next().unwrap_or("").trim().to_string();
    Ok((format!("{}postgres", &url[..slash]), db_name))
}
