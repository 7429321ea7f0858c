use accelerated_model::adapter::apply_model_filter;
use accelerated_model::{
    execute, load_schema_str, AdapterFactory, AppError, Args, Backend, BoxError, CrudAdapter, Operation,
    OperationRequest, Outcome, Rows, Schema,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

const WIDGETS: &str = r#"{
    "table_name": "widgets",
    "primary_key": "widget_id",
    "columns": [["widget_id", "uuid"], ["widget_name", "string"], ["secret", "string"],
                ["widgets_created", "timestamp"], ["widgets_updated", "timestamp"]],
    "whitelist": {"default": ["widget_name"], "create": ["widget_name"]}
}"#;

fn args(v: Value) -> Args {
    v.as_object().cloned().unwrap()
}

async fn adapter() -> Arc<dyn CrudAdapter> {
    let schema = Arc::new(load_schema_str(WIDGETS).unwrap());
    let adapter = AdapterFactory::new(Backend::memory()).build(schema);
    execute(adapter.as_ref(), OperationRequest::new(Operation::Setup))
        .await
        .unwrap();
    adapter
}

fn rows(outcome: Outcome) -> Rows {
    match outcome {
        Outcome::Rows(r) => r,
        Outcome::Ack => panic!("expected rows"),
    }
}

#[tokio::test]
async fn non_whitelisted_args_never_reach_the_store() {
    let a = adapter().await;
    let created = a.create(args(json!({"widget_name": "a", "secret": "s"}))).await.unwrap();
    assert!(created[0].get("secret").is_none());
    let id = created[0]["widget_id"].clone();

    a.update(&id, args(json!({"secret": "t"}))).await.unwrap();
    let stored = a.get(&id).await.unwrap();
    assert!(stored[0].get("secret").is_none());
    assert!(stored[0]["widgets_created"].is_number());
}

#[tokio::test]
async fn bogus_predicate_reads_like_get_all() {
    let a = adapter().await;
    a.create(args(json!({"widget_name": "a"}))).await.unwrap();
    a.create(args(json!({"widget_name": "b"}))).await.unwrap();
    let all = a.get_all().await.unwrap();
    let bogus = a.get_all_where(args(json!({"bogus": "x"}))).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(bogus.len(), all.len());
}

#[tokio::test]
async fn execute_dispatches_and_checks_inputs() {
    let a = adapter().await;
    let out = execute(
        a.as_ref(),
        OperationRequest::new(Operation::Create).args(args(json!({"widget_name": "a"}))),
    )
    .await
    .unwrap();
    let id = rows(out)[0]["widget_id"].clone();

    let out = execute(a.as_ref(), OperationRequest::new(Operation::Get).id(id.clone()))
        .await
        .unwrap();
    assert_eq!(rows(out).len(), 1);

    let missing_id = execute(a.as_ref(), OperationRequest::new(Operation::Delete)).await;
    assert!(matches!(missing_id, Err(AppError::BadRequest(_))));

    let missing_where = execute(a.as_ref(), OperationRequest::new(Operation::GetAllWhere)).await;
    assert!(matches!(missing_where, Err(AppError::BadRequest(_))));

    let out = execute(a.as_ref(), OperationRequest::new(Operation::Delete).id(id))
        .await
        .unwrap();
    assert_eq!(out, Outcome::Ack);
    assert_eq!(Operation::GetAllWhere.to_string(), "getAllWhere");
}

#[tokio::test]
async fn concurrent_creates_are_independent() {
    let a = adapter().await;
    let mut handles = Vec::new();
    for i in 0..20 {
        let a = a.clone();
        handles.push(tokio::spawn(async move {
            a.create(args(json!({"widget_name": format!("w{}", i)}))).await
        }));
    }
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap().len(), 1);
    }
    assert_eq!(a.get_all().await.unwrap().len(), 20);
}

/// Adds a `count` operation and leaves everything else to the inner adapter.
struct Counting {
    inner: Arc<dyn CrudAdapter>,
}

#[async_trait]
impl CrudAdapter for Counting {
    fn schema(&self) -> &Schema {
        self.inner.schema()
    }
    async fn setup(&self) -> Result<(), AppError> {
        self.inner.setup().await
    }
    async fn create(&self, args: Args) -> Result<Rows, AppError> {
        self.inner.create(args).await
    }
    async fn get(&self, id: &Value) -> Result<Rows, AppError> {
        self.inner.get(id).await
    }
    async fn get_all(&self) -> Result<Rows, AppError> {
        self.inner.get_all().await
    }
    async fn get_all_where(&self, predicate: Args) -> Result<Rows, AppError> {
        self.inner.get_all_where(predicate).await
    }
    async fn update(&self, id: &Value, args: Args) -> Result<Rows, AppError> {
        self.inner.update(id, args).await
    }
    async fn update_where(&self, predicate: Args, args: Args) -> Result<Rows, AppError> {
        self.inner.update_where(predicate, args).await
    }
    async fn delete(&self, id: &Value) -> Result<(), AppError> {
        self.inner.delete(id).await
    }
    async fn delete_where(&self, predicate: Args) -> Result<(), AppError> {
        self.inner.delete_where(predicate).await
    }
    async fn invoke(&self, operation: &str, args: Args) -> Result<Rows, AppError> {
        match operation {
            "count" => {
                let n = self.inner.get_all_where(args).await?.len();
                Ok(vec![args_row("count", json!(n))])
            }
            other => self.inner.invoke(other, args).await,
        }
    }
}

fn args_row(k: &str, v: Value) -> accelerated_model::Row {
    let mut m = accelerated_model::Row::new();
    m.insert(k.to_string(), v);
    m
}

#[tokio::test]
async fn model_filter_can_add_operations() {
    let a = adapter().await;
    let schema = a.schema().clone();
    let filter = |inner: Arc<dyn CrudAdapter>, _: &Schema| -> Result<Arc<dyn CrudAdapter>, BoxError> {
        Ok(Arc::new(Counting { inner }))
    };
    let wrapped = apply_model_filter(&filter, a, &schema);
    wrapped.create(args(json!({"widget_name": "a"}))).await.unwrap();
    let out = wrapped.invoke("count", Args::new()).await.unwrap();
    assert_eq!(out[0]["count"], json!(1));
    assert!(matches!(
        wrapped.invoke("explode", Args::new()).await,
        Err(AppError::UnknownOperation(_))
    ));
}

#[tokio::test]
async fn failing_model_filter_keeps_original() {
    let a = adapter().await;
    let schema = a.schema().clone();
    let filter = |_: Arc<dyn CrudAdapter>, _: &Schema| -> Result<Arc<dyn CrudAdapter>, BoxError> {
        Err("cannot wrap".into())
    };
    let kept = apply_model_filter(&filter, a.clone(), &schema);
    assert!(Arc::ptr_eq(&kept, &a));
}
