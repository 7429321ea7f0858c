//! The uniform CRUD surface and its two backend strategies.
//!
//! Every operation whitelists its input, builds one backend statement, runs it,
//! and shapes the result into rows. Each call resolves to exactly one
//! `Ok`/`Err`; backend errors are passed through untranslated.

mod document;
mod factory;
mod filter;
mod relational;

pub use document::DocumentAdapter;
pub use factory::AdapterFactory;
pub use filter::{apply_model_filter, ModelFilter};
pub(crate) use filter::guarded;
pub use relational::RelationalAdapter;

use crate::config::Schema;
use crate::error::AppError;
use crate::shape::Rows;
use crate::whitelist::Args;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

#[async_trait]
pub trait CrudAdapter: Send + Sync {
    fn schema(&self) -> &Schema;

    /// Create the backing table/collection when it does not exist yet.
    async fn setup(&self) -> Result<(), AppError>;

    async fn create(&self, args: Args) -> Result<Rows, AppError>;

    async fn get(&self, id: &Value) -> Result<Rows, AppError>;

    async fn get_all(&self) -> Result<Rows, AppError>;

    /// Non-whitelisted predicate keys are dropped; an empty predicate reads everything.
    async fn get_all_where(&self, predicate: Args) -> Result<Rows, AppError>;

    async fn update(&self, id: &Value, args: Args) -> Result<Rows, AppError>;

    async fn update_where(&self, predicate: Args, args: Args) -> Result<Rows, AppError>;

    async fn delete(&self, id: &Value) -> Result<(), AppError>;

    async fn delete_where(&self, predicate: Args) -> Result<(), AppError>;

    /// Operations added by a model filter. The built-in strategies have none.
    async fn invoke(&self, operation: &str, _args: Args) -> Result<Rows, AppError> {
        Err(AppError::UnknownOperation(operation.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Get,
    GetAll,
    GetAllWhere,
    Update,
    UpdateWhere,
    Delete,
    DeleteWhere,
    Setup,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::GetAll => "getAll",
            Operation::GetAllWhere => "getAllWhere",
            Operation::Update => "update",
            Operation::UpdateWhere => "updateWhere",
            Operation::Delete => "delete",
            Operation::DeleteWhere => "deleteWhere",
            Operation::Setup => "_setup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One operation with its inputs. Only the fields the operation uses are read.
#[derive(Clone, Debug)]
pub struct OperationRequest {
    pub operation: Operation,
    pub id: Option<Value>,
    pub where_: Option<Args>,
    pub args: Option<Args>,
}

impl OperationRequest {
    pub fn new(operation: Operation) -> Self {
        OperationRequest {
            operation,
            id: None,
            where_: None,
            args: None,
        }
    }

    pub fn id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn where_(mut self, predicate: Args) -> Self {
        self.where_ = Some(predicate);
        self
    }

    pub fn args(mut self, args: Args) -> Self {
        self.args = Some(args);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Rows(Rows),
    /// Delete and setup acknowledge without a payload.
    Ack,
}

/// Dispatch a request to the matching adapter operation.
pub async fn execute(adapter: &dyn CrudAdapter, request: OperationRequest) -> Result<Outcome, AppError> {
    let op = request.operation;
    let id = || {
        request
            .id
            .clone()
            .ok_or_else(|| AppError::BadRequest(format!("{} requires an id", op)))
    };
    let predicate = || {
        request
            .where_
            .clone()
            .ok_or_else(|| AppError::BadRequest(format!("{} requires a where map", op)))
    };
    let args = request.args.clone().unwrap_or_default();
    Ok(match op {
        Operation::Create => Outcome::Rows(adapter.create(args).await?),
        Operation::Get => Outcome::Rows(adapter.get(&id()?).await?),
        Operation::GetAll => Outcome::Rows(adapter.get_all().await?),
        Operation::GetAllWhere => Outcome::Rows(adapter.get_all_where(predicate()?).await?),
        Operation::Update => Outcome::Rows(adapter.update(&id()?, args).await?),
        Operation::UpdateWhere => Outcome::Rows(adapter.update_where(predicate()?, args).await?),
        Operation::Delete => {
            adapter.delete(&id()?).await?;
            Outcome::Ack
        }
        Operation::DeleteWhere => {
            adapter.delete_where(predicate()?).await?;
            Outcome::Ack
        }
        Operation::Setup => {
            adapter.setup().await?;
            Outcome::Ack
        }
    })
}
