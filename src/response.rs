//! Standard response envelope: `{ "data": ..., "error"?: ... }`.

use axum::{http::StatusCode, Json};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

pub fn success<T: Serialize>(status: StatusCode, data: T) -> (StatusCode, Json<Envelope<T>>) {
    (status, Json(Envelope { data, error: None }))
}

pub fn success_ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    success(StatusCode::OK, data)
}

pub fn success_created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    success(StatusCode::CREATED, data)
}

/// Reads report 404 when nothing matched, with the (empty) rows still in `data`.
pub fn rows_or_not_found<T: Serialize>(rows: Vec<T>) -> (StatusCode, Json<Envelope<Vec<T>>>) {
    let status = if rows.is_empty() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    };
    success(status, rows)
}

pub fn error_body(error: Value) -> Envelope<Vec<Value>> {
    Envelope {
        data: Vec::new(),
        error: Some(error),
    }
}
