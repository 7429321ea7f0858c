use accelerated_model::{
    common_routes, load_schema_str, AdapterFactory, Backend, BoxError, CrudAdapter, CrudModule, ModuleSettings,
    Schema,
};
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const WIDGETS: &str = r#"{
    "table_name": "widgets",
    "primary_key": "widget_id",
    "columns": [["widget_id", "uuid"], ["widget_name", "string"], ["size", "integer"], ["secret", "string"]],
    "whitelist": {"default": ["widget_name", "size"]}
}"#;

async fn module_with(settings: ModuleSettings) -> CrudModule {
    let module = CrudModule::build(settings, &AdapterFactory::new(Backend::memory()));
    assert!(module.setup_if_requested(["bin", "setup"]).await.unwrap());
    module
}

async fn app() -> Router {
    let module = module_with(ModuleSettings::new(load_schema_str(WIDGETS).unwrap())).await;
    module.router()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

#[tokio::test]
async fn create_then_read_back() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/widgets", Some(json!({"widget_name": "a", "secret": "s"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["widget_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["widget_name"], json!("a"));
    assert!(body["data"].get("secret").is_none());

    let (status, body) = send(&app, "GET", &format!("/widgets/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["widget_name"], json!("a"));

    let (status, body) = send(&app, "GET", "/widgets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_reads_are_404_with_empty_data() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/widgets/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"], json!([]));

    let (status, _) = send(&app, "GET", "/widgets/widget_name/nobody", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/widgets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn property_routes_match_on_coerced_values() {
    let app = app().await;
    send(&app, "POST", "/widgets", Some(json!({"widget_name": "a", "size": 2}))).await;
    send(&app, "POST", "/widgets", Some(json!({"widget_name": "b", "size": 2}))).await;
    send(&app, "POST", "/widgets", Some(json!({"widget_name": "c", "size": 3}))).await;

    let (status, body) = send(&app, "GET", "/widgets/size/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "PUT", "/widgets/size/2", Some(json!({"size": 7}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "DELETE", "/widgets/size/7", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (_, body) = send(&app, "GET", "/widgets", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_with_empty_body_is_not_an_error() {
    let app = app().await;
    let (_, body) = send(&app, "POST", "/widgets", Some(json!({"widget_name": "a"}))).await;
    let id = body["data"]["widget_id"].as_str().unwrap().to_string();
    let (status, body) = send(&app, "PUT", &format!("/widgets/{}", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn delete_of_missing_id_is_500_with_write_result() {
    let app = app().await;
    let (status, body) = send(&app, "DELETE", "/widgets/missing", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["error"]["deleted"], json!(0));
}

#[tokio::test]
async fn non_object_body_is_400() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/widgets", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"], json!([]));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unrestricted_delete_where_is_400() {
    let app = app().await;
    let (status, _) = send(&app, "DELETE", "/widgets/secret/x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn route_filter_adds_routes_and_failures_fall_back() {
    let schema = load_schema_str(WIDGETS).unwrap();
    let extended = module_with(ModuleSettings::new(schema.clone()).filter_route(|r: Router| {
        Ok::<_, BoxError>(r.route("/ping", get(|| async { Json(json!({"pong": true})) })))
    }))
    .await
    .router();
    let (status, body) = send(&extended, "GET", "/widgets/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"pong": true}));

    let broken = module_with(
        ModuleSettings::new(schema)
            .key("gadgets")
            .filter_route(|_: Router| -> Result<Router, BoxError> { Err("no".into()) }),
    )
    .await
    .router();
    let (status, _) = send(&broken, "GET", "/gadgets", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn model_filter_panic_keeps_plain_model() {
    let schema = load_schema_str(WIDGETS).unwrap();
    let settings = ModuleSettings::new(schema).filter_model(
        |_: Arc<dyn CrudAdapter>, _: &Schema| -> Result<Arc<dyn CrudAdapter>, BoxError> { panic!("bad filter") },
    );
    let app = module_with(settings).await.router();
    let (status, _) = send(&app, "POST", "/widgets", Some(json!({"widget_name": "a"}))).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn health_and_version() {
    let app = common_routes();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    let (_, body) = send(&app, "GET", "/version", None).await;
    assert_eq!(body["name"], json!("accelerated-model"));
}
