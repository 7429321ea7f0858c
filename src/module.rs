//! A CRUD module: a key, a display name, a schema, the adapter built for it,
//! and the routes mounted under `/<key>`.

use crate::adapter::{apply_model_filter, guarded, AdapterFactory, CrudAdapter, ModelFilter};
use crate::config::{load_schema_file, Schema};
use crate::error::{AppError, BoxError};
use crate::routes::resource_routes;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Argument that triggers table setup at startup.
pub const SETUP_ARG: &str = "setup";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Rewrites a module's router before it is mounted (extra routes, middleware).
pub trait RouteFilter: Send + Sync {
    fn filter(&self, router: Router) -> Result<Router, BoxError>;
}

impl<F> RouteFilter for F
where
    F: Fn(Router) -> Result<Router, BoxError> + Send + Sync,
{
    fn filter(&self, router: Router) -> Result<Router, BoxError> {
        self(router)
    }
}

pub struct ModuleSettings {
    pub key: String,
    pub name: String,
    pub schema: Schema,
    pub filter_model: Option<Arc<dyn ModelFilter>>,
    pub filter_route: Option<Arc<dyn RouteFilter>>,
    pub body_limit: usize,
}

impl ModuleSettings {
    /// Key and name both default to the table name.
    pub fn new(schema: Schema) -> Self {
        ModuleSettings {
            key: schema.table_name.clone(),
            name: schema.table_name.clone(),
            schema,
            filter_model: None,
            filter_route: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        Ok(Self::new(load_schema_file(path)?))
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn filter_model(mut self, filter: impl ModelFilter + 'static) -> Self {
        self.filter_model = Some(Arc::new(filter));
        self
    }

    pub fn filter_route(mut self, filter: impl RouteFilter + 'static) -> Self {
        self.filter_route = Some(Arc::new(filter));
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

pub struct CrudModule {
    key: String,
    name: String,
    adapter: Arc<dyn CrudAdapter>,
    filter_route: Option<Arc<dyn RouteFilter>>,
    body_limit: usize,
}

impl CrudModule {
    pub fn build(settings: ModuleSettings, factory: &AdapterFactory) -> Self {
        let schema = Arc::new(settings.schema);
        let mut adapter = factory.build(schema.clone());
        if let Some(filter) = &settings.filter_model {
            adapter = apply_model_filter(filter.as_ref(), adapter, &schema);
        }
        tracing::debug!(key = %settings.key, backend = factory.backend().kind(), "module built");
        CrudModule {
            key: settings.key,
            name: settings.name,
            adapter,
            filter_route: settings.filter_route,
            body_limit: settings.body_limit,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> Arc<dyn CrudAdapter> {
        self.adapter.clone()
    }

    /// Run `setup` once when any argument equals `setup`. Returns whether it ran.
    pub async fn setup_if_requested<I, S>(&self, args: I) -> Result<bool, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !args.into_iter().any(|a| a.as_ref() == SETUP_ARG) {
            return Ok(false);
        }
        self.adapter.setup().await?;
        Ok(true)
    }

    /// Routes for this module, nested under `/<key>`.
    pub fn router(&self) -> Router {
        let mut routes = resource_routes(self.adapter.clone());
        if let Some(filter) = &self.filter_route {
            routes = guarded("route", &self.key, routes, |r| filter.filter(r));
        }
        Router::new()
            .nest(&format!("/{}", self.key), routes)
            .layer(RequestBodyLimitLayer::new(self.body_limit))
    }
}

/// Mount every module on one router.
pub fn mount_all(modules: &[CrudModule]) -> Router {
    modules
        .iter()
        .fold(Router::new(), |app, m| app.merge(m.router()))
}
