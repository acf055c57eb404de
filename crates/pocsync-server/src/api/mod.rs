//! API module for the Pocsync server
//!
//! Hosts the two ingress surfaces: the async webhook endpoint that publishes
//! events to the ingress queue, and the sync call endpoint that matches and
//! executes a pipeline in-request.

use crate::error::ServerError;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pocsync_core::{
    matches_pattern, Event, EventRouter, IntegrationRegistry, JsonMap, PipelineDirectory,
    PipelineExecutor,
};
use pocsync_broker::MessageBroker;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared dependencies for the API handlers.
pub struct AppState {
    /// Broker the async ingress publishes through
    pub broker: Arc<dyn MessageBroker>,
    /// Directory of known pipelines
    pub directory: Arc<dyn PipelineDirectory>,
    /// Registry backing the integrations endpoint
    pub registry: Arc<IntegrationRegistry>,
    /// Executor for sync calls
    pub executor: Arc<PipelineExecutor>,
    /// Router consulted for queue names (exposed for consumers sharing state)
    pub router: Arc<EventRouter>,
    /// Ingress queue for raw events
    pub event_queue: String,
}

/// Build the router for API endpoints
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Async ingress: publish and return
        .route("/api/webhook/:app_id", get(handle_webhook).post(handle_webhook))
        .route(
            "/api/webhook/:app_id/*path",
            get(handle_webhook).post(handle_webhook),
        )
        // Sync ingress: match + execute in-request
        .route("/api/call/:app_id", get(handle_call).post(handle_call))
        .route("/api/call/:app_id/*path", get(handle_call).post(handle_call))
        // Registry snapshots
        .route("/api/integrations", get(handle_list_integrations))
        .route("/api/integrations/:name", get(handle_get_integration))
        // Health check
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Handler for the async webhook ingress
async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    let event = build_event(&method, &uri, query, &headers, body.map(|Json(value)| value));

    match serde_json::to_vec(&event) {
        Ok(payload) => {
            if let Err(err) = state.broker.publish(&state.event_queue, &payload).await {
                // Errors are invisible to the webhook caller by design.
                error!(queue = %state.event_queue, error = %err, "failed to publish ingress event");
            } else {
                debug!(path = %event.path, "published ingress event");
            }
        }
        Err(err) => error!(error = %err, "failed to encode ingress event"),
    }

    (
        StatusCode::OK,
        Json(json!({"message": "Event received and processed"})),
    )
        .into_response()
}

/// Handler for the sync call ingress
async fn handle_call(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    let event = build_event(&method, &uri, query, &headers, body.map(|Json(value)| value));
    let event_value = event.to_value();

    let pipelines = match state.directory.list_pipelines().await {
        Ok(pipelines) => pipelines,
        Err(err) => {
            error!(error = %err, "failed to list pipelines");
            return error_response(&ServerError::CoreError(err));
        }
    };

    let Some(pipeline) = pipelines
        .into_iter()
        .find(|pipeline| matches_pattern(&event_value, &pipeline.pattern))
    else {
        return error_response(&ServerError::NotFound(
            "No matching pipeline found".to_string(),
        ));
    };

    info!(pipeline_id = %pipeline.id, path = %event.path, "executing pipeline for sync call");
    let record = state.executor.execute(&pipeline, event_value).await;

    if record.is_success() {
        let data = record
            .final_output()
            .map(|output| Value::Object(output.clone()))
            .unwrap_or(Value::Null);
        (StatusCode::OK, Json(json!({"data": data}))).into_response()
    } else {
        let error = record
            .error
            .unwrap_or_else(|| "Pipeline execution failed".to_string());
        (StatusCode::BAD_REQUEST, Json(json!({"error": error}))).into_response()
    }
}

/// Handler for the registry snapshot
async fn handle_list_integrations(State(state): State<Arc<AppState>>) -> Response {
    let integrations = state.registry.list_integrations().await;
    (StatusCode::OK, Json(json!({"integrations": integrations}))).into_response()
}

/// Handler for one integration's detail view
async fn handle_get_integration(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let Some(integration) = state.registry.get_integration(&name).await else {
        return error_response(&ServerError::NotFound(format!(
            "Integration {name} not found"
        )));
    };

    let actions: Vec<Value> = state
        .registry
        .list_actions(&name)
        .await
        .into_iter()
        .map(|action| json!({"name": action.name, "description": action.description}))
        .collect();

    (
        StatusCode::OK,
        Json(json!({
            "name": integration.name,
            "description": integration.description,
            "actions": actions,
        })),
    )
        .into_response()
}

/// Map a server error onto the API's JSON error shape.
fn error_response(error: &ServerError) -> Response {
    let status = match error {
        ServerError::NotFound(_) => StatusCode::NOT_FOUND,
        ServerError::InternalError(_) | ServerError::BrokerError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    let body = match error {
        ServerError::NotFound(message) => json!({"message": message}),
        other => json!({"error": other.to_string()}),
    };
    (status, Json(body)).into_response()
}

/// Liveness probe
async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "pocsync-server",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

/// Construct an Event from the pieces of an HTTP request. Query parameters
/// and decoded JSON body fields merge into `params`, body fields winning.
fn build_event(
    method: &Method,
    uri: &Uri,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) -> Event {
    let mut params = JsonMap::new();
    for (key, value) in query {
        params.insert(key, Value::String(value));
    }
    if let Some(Value::Object(fields)) = body {
        for (key, value) in fields {
            params.insert(key, value);
        }
    }

    let mut header_map = JsonMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            header_map.insert(name.to_string(), Value::String(value.to_string()));
        }
    }

    Event {
        source: "webhook".to_string(),
        path: uri.path().to_string(),
        method: Some(method.to_string()),
        params,
        headers: header_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_event_merges_query_and_body() {
        let uri: Uri = "/api/webhook/shopee/order/created?shop_id=123&status=query"
            .parse()
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());

        let query = HashMap::from([
            ("shop_id".to_string(), "123".to_string()),
            ("status".to_string(), "query".to_string()),
        ]);
        let body = Some(json!({"order_id": "12345", "status": "created"}));

        let event = build_event(&Method::POST, &uri, query, &headers, body);

        assert_eq!(event.source, "webhook");
        assert_eq!(event.path, "/api/webhook/shopee/order/created");
        assert_eq!(event.method.as_deref(), Some("POST"));
        assert_eq!(event.params["shop_id"], json!("123"));
        assert_eq!(event.params["order_id"], json!("12345"));
        // Body fields win over query parameters.
        assert_eq!(event.params["status"], json!("created"));
        assert_eq!(event.headers["content-type"], json!("application/json"));
    }

    #[test]
    fn test_build_event_without_body() {
        let uri: Uri = "/api/webhook/shopee".parse().unwrap();
        let event = build_event(&Method::GET, &uri, HashMap::new(), &HeaderMap::new(), None);

        assert!(event.params.is_empty());
        assert_eq!(event.path, "/api/webhook/shopee");
    }
}
