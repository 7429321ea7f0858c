//! Backend selection and connection parameters, read once at startup.

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// PostgreSQL tables built from the declared columns.
    Relational,
    /// JSON documents persisted in PostgreSQL JSONB collections.
    Document,
    /// JSON documents held in process memory.
    Memory,
}

impl BackendKind {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" | "relational" => Ok(BackendKind::Relational),
            "reql" | "rethinkdb" | "document" => Ok(BackendKind::Document),
            "memory" => Ok(BackendKind::Memory),
            other => Err(ConfigError::Settings(format!("unknown DB_CLIENT '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Full URL override; when set the individual parts are ignored.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionSettings {
    pub fn url(&self) -> String {
        match &self.url {
            Some(u) => u.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            ),
        }
    }

    fn from_lookup<F>(lookup: &F, prefix: &str, url_var: &str, default_db: &str) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}_{}", prefix, name));
        let port = match var("PORT") {
            Some(p) => p
                .trim()
                .parse()
                .map_err(|_| ConfigError::Settings(format!("{}_PORT is not a port: {}", prefix, p)))?,
            None => 5432,
        };
        Ok(ConnectionSettings {
            url: lookup(url_var),
            host: var("HOST").unwrap_or_else(|| "localhost".into()),
            port,
            user: var("USER").unwrap_or_else(|| "root".into()),
            password: var("PASSWORD").unwrap_or_else(|| "root".into()),
            database: var("DATABASE")
                .or_else(|| var("DB"))
                .unwrap_or_else(|| default_db.into()),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub backend: BackendKind,
    pub relational: ConnectionSettings,
    pub document: ConnectionSettings,
    pub max_connections: u32,
}

impl Settings {
    /// Read settings from the process environment (call `dotenvy::dotenv()` first to pick up `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read settings through an arbitrary lookup; missing values fall back to local development defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = match lookup("DB_CLIENT") {
            Some(v) if !v.trim().is_empty() => BackendKind::parse(&v)?,
            _ => BackendKind::Document,
        };
        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Settings(format!("DB_MAX_CONNECTIONS is not a number: {}", v)))?,
            None => 5,
        };
        Ok(Settings {
            backend,
            relational: ConnectionSettings::from_lookup(&lookup, "PG", "DATABASE_URL", "api")?,
            document: ConnectionSettings::from_lookup(&lookup, "DOCSTORE", "DOCSTORE_URL", "test")?,
            max_connections,
        })
    }
}
