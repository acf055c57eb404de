//! Ingress API tests driven through the real router with the in-memory
//! broker behind it.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use pocsync_core::{
    Event, EventRouter, InMemoryPipelineDirectory, IntegrationRegistry, JsonMap, Pipeline,
    PipelineExecutor, PipelineStatus, Step, StepType,
};
use pocsync_broker::InMemoryBroker;
use pocsync_server::api::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn object(value: Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

fn user_sync_pipeline() -> Pipeline {
    Pipeline::new(
        "user sync",
        object(json!({"source": "webhook", "path": "/api/call/users/sync"})),
        vec![
            Step::new(
                "trigger",
                StepType::Trigger,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::WEBHOOK_TRIGGER,
                JsonMap::new(),
                0,
            ),
            Step::new(
                "map user fields",
                StepType::Action,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::MAP_FIELDS,
                object(json!({"mapping": {"user_id": "id", "user_name": "name"}})),
                1,
            ),
        ],
    )
    .with_status(PipelineStatus::Active)
}

fn webhook_only_pipeline() -> Pipeline {
    Pipeline::new(
        "webhook orders",
        object(json!({"source": "webhook", "path": "/api/webhook/shopee"})),
        vec![Step::new(
            "trigger",
            StepType::Trigger,
            pocsync_actions::BUILTIN_INTEGRATION,
            pocsync_actions::WEBHOOK_TRIGGER,
            JsonMap::new(),
            0,
        )],
    )
    .with_status(PipelineStatus::Active)
}

fn broken_pipeline() -> Pipeline {
    Pipeline::new(
        "broken",
        object(json!({"path": "/api/call/broken"})),
        vec![Step::new(
            "dangling",
            StepType::Action,
            "missing.integration",
            "missing.action",
            JsonMap::new(),
            0,
        )],
    )
}

async fn test_app(pipelines: Vec<Pipeline>) -> (Router, Arc<InMemoryBroker>) {
    let registry = Arc::new(IntegrationRegistry::new());
    pocsync_actions::register_builtin(&registry).await;

    let broker = Arc::new(InMemoryBroker::new());
    let state = Arc::new(AppState {
        broker: broker.clone(),
        directory: Arc::new(InMemoryPipelineDirectory::with_pipelines(pipelines)),
        registry: registry.clone(),
        executor: Arc::new(PipelineExecutor::new(registry)),
        router: Arc::new(EventRouter::new(vec![])),
        event_queue: "inn_event_queue".to_string(),
    });
    (build_router(state), broker)
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn sync_call_without_matching_pipeline_is_404() {
    let (app, _broker) = test_app(vec![webhook_only_pipeline()]).await;

    let response = app
        .oneshot(post_json("/api/call/unknown/anything", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body, json!({"message": "No matching pipeline found"}));
}

#[tokio::test]
async fn async_webhook_publishes_exactly_one_event() {
    let (app, broker) = test_app(vec![]).await;

    let response = app
        .oneshot(post_json(
            "/api/webhook/shopee/order/created",
            json!({"order_id": "12345"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body, json!({"message": "Event received and processed"}));

    let published = broker.published("inn_event_queue").await;
    assert_eq!(published.len(), 1);
    let event: Event = serde_json::from_slice(&published[0]).unwrap();
    assert_eq!(event.source, "webhook");
    assert_eq!(event.path, "/api/webhook/shopee/order/created");
    assert_eq!(event.method.as_deref(), Some("POST"));
    assert_eq!(event.params["order_id"], json!("12345"));
}

#[tokio::test]
async fn webhook_accepts_get_requests_with_query_params() {
    let (app, broker) = test_app(vec![]).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/webhook/shopee?order_id=9")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let published = broker.published("inn_event_queue").await;
    assert_eq!(published.len(), 1);
    let event: Event = serde_json::from_slice(&published[0]).unwrap();
    assert_eq!(event.params["order_id"], json!("9"));
}

#[tokio::test]
async fn sync_call_executes_first_match_and_returns_final_output() {
    let (app, _broker) = test_app(vec![webhook_only_pipeline(), user_sync_pipeline()]).await;

    let response = app
        .oneshot(post_json(
            "/api/call/users/sync",
            json!({"user_id": 123, "user_name": "John Doe"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body, json!({"data": {"id": 123, "name": "John Doe"}}));
}

#[tokio::test]
async fn sync_call_surfaces_execution_failure_as_400() {
    let (app, _broker) = test_app(vec![broken_pipeline()]).await;

    let response = app
        .oneshot(post_json("/api/call/broken", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["error"],
        json!("Action not found: missing.integration.missing.action")
    );
}

#[tokio::test]
async fn health_endpoint_reports_healthy() {
    let (app, _broker) = test_app(vec![]).await;

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn integrations_endpoint_lists_builtin() {
    let (app, _broker) = test_app(vec![]).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/integrations")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let integrations = body["integrations"].as_array().unwrap();
    assert_eq!(integrations.len(), 1);
    assert_eq!(integrations[0]["name"], json!("pocsync.builtin"));
    assert_eq!(integrations[0]["action_count"], json!(5));
}

#[tokio::test]
async fn integration_detail_endpoint_lists_actions() {
    let (app, _broker) = test_app(vec![]).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/integrations/pocsync.builtin")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["name"], json!("pocsync.builtin"));
    let actions = body["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 5);
    assert!(actions
        .iter()
        .any(|action| action["name"] == json!("pocsync.transform.map_fields")));
}

#[tokio::test]
async fn unknown_integration_detail_is_404() {
    let (app, _broker) = test_app(vec![]).await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/integrations/unknown")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body, json!({"message": "Integration unknown not found"}));
}
