//! Typed errors and HTTP mapping.

use crate::document::WriteResult;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("schema io: {0}")]
    Io(#[from] std::io::Error),
    #[error("schema parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid primary key: table {table} column {column}")]
    InvalidPrimaryKey { table: String, column: String },
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("unknown column type '{type_}' for column {column}")]
    UnknownColumnType { column: String, type_: String },
    #[error("settings: {0}")]
    Settings(String),
}

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("table not found: {0}")]
    TableNotFound(String),
    #[error("table already exists: {0}")]
    TableExists(String),
    #[error("document store: {0}")]
    Db(#[from] sqlx::Error),
    #[error("invalid document: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// A mutating document-store call reported nothing written.
    #[error("{operation} affected no rows")]
    NoRowsAffected {
        operation: &'static str,
        result: WriteResult,
    },
    #[error("predicate has no whitelisted columns for {0}")]
    EmptyPredicate(&'static str),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Error payload echoed to clients. Backend errors are passed through as-is.
    pub fn detail(&self) -> Value {
        match self {
            AppError::NoRowsAffected { result, .. } => {
                serde_json::to_value(result).unwrap_or_else(|_| Value::String(self.to_string()))
            }
            _ => Value::String(self.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::EmptyPredicate(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::UnknownOperation(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(crate::response::error_body(self.detail()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_rows_detail_is_the_write_result() {
        let err = AppError::NoRowsAffected {
            operation: "delete",
            result: WriteResult::default(),
        };
        let detail = err.detail();
        assert_eq!(detail["deleted"], 0);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::EmptyPredicate("deleteWhere").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
    }
}
