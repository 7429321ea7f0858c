//! Resource handlers: one adapter operation per route, results wrapped in the `{ data, error? }` envelope.

use crate::error::AppError;
use crate::response::{rows_or_not_found, success_created, success_ok};
use crate::state::ResourceState;
use crate::whitelist::Args;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

fn body_args(body: Result<Json<Value>, JsonRejection>) -> Result<Args, AppError> {
    let Json(value) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn where_args(property: String, value: String) -> Args {
    let mut m = Args::new();
    m.insert(property, Value::String(value));
    m
}

pub async fn create(
    State(state): State<ResourceState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let rows = state.adapter.create(body_args(body)?).await?;
    Ok(success_created(rows.into_iter().next()))
}

pub async fn list(State(state): State<ResourceState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_ok(state.adapter.get_all().await?))
}

pub async fn read(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rows = state.adapter.get(&Value::String(id)).await?;
    Ok(rows_or_not_found(rows))
}

pub async fn update(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let args = body_args(body)?;
    Ok(success_ok(state.adapter.update(&Value::String(id), args).await?))
}

pub async fn delete(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.adapter.delete(&Value::String(id)).await?;
    Ok(success_ok(Vec::<Value>::new()))
}

pub async fn read_where(
    State(state): State<ResourceState>,
    Path((property, value)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let rows = state.adapter.get_all_where(where_args(property, value)).await?;
    Ok(rows_or_not_found(rows))
}

pub async fn update_where(
    State(state): State<ResourceState>,
    Path((property, value)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let args = body_args(body)?;
    let rows = state
        .adapter
        .update_where(where_args(property, value), args)
        .await?;
    Ok(success_ok(rows))
}

pub async fn delete_where(
    State(state): State<ResourceState>,
    Path((property, value)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state.adapter.delete_where(where_args(property, value)).await?;
    Ok(success_ok(Vec::<Value>::new()))
}
