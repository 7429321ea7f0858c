//! Accelerated model: schema-driven CRUD modules over PostgreSQL tables or a JSON document store.

pub mod adapter;
pub mod config;
pub mod connection;
pub mod document;
pub mod error;
pub mod handlers;
pub mod module;
pub mod response;
pub mod routes;
pub mod shape;
pub mod sql;
pub mod state;
pub mod timestamp;
pub mod whitelist;

pub use adapter::{execute, AdapterFactory, CrudAdapter, ModelFilter, Operation, OperationRequest, Outcome};
pub use config::{load_schema_file, load_schema_str, BackendKind, Schema, Settings};
pub use connection::Backend;
pub use error::{AppError, BoxError, ConfigError, DocumentError};
pub use module::{mount_all, CrudModule, ModuleSettings, RouteFilter};
pub use response::error_body;
pub use routes::common_routes;
pub use shape::{Row, Rows};
pub use whitelist::Args;
