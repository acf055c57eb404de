//! End-to-end tests over the assembled core: registry, matcher, router and
//! both executors working together the way the consumers drive them.

use pocsync_core::{
    handler_fn, matches_pattern, ActionDefinition, CoreError, EventRouter, Integration,
    IntegrationRegistry, Pipeline, PipelineExecutor, RouteRule, Step, StepType,
};
use serde_json::{json, Value};
use std::sync::Arc;

const INTEGRATION: &str = "acme.crm";

fn object(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn registry() -> Arc<IntegrationRegistry> {
    let integration = Integration::new(INTEGRATION, "demo CRM actions")
        .with_action(ActionDefinition::new(
            "passthrough",
            "returns upstream data unchanged",
            handler_fn(|input| {
                Ok(input
                    .get("pipeline_data")
                    .cloned()
                    .unwrap_or_else(|| json!({})))
            }),
        ))
        .with_action(ActionDefinition::new(
            "rename",
            "projects fields through a static mapping",
            handler_fn(|input| {
                let mapping = object(input.get("mapping").cloned().unwrap_or(json!({})));
                let mut out = serde_json::Map::new();
                for (source, target) in mapping {
                    if let (Some(value), Some(target)) = (input.get(&source), target.as_str()) {
                        out.insert(target.to_string(), value.clone());
                    }
                }
                Ok(Value::Object(out))
            }),
        ))
        .with_action(ActionDefinition::new(
            "explode",
            "panics to prove containment",
            handler_fn(|_| panic!("divide by zero")),
        ));

    let registry = IntegrationRegistry::new();
    registry.register(integration).await;
    Arc::new(registry)
}

fn mapping_pipeline() -> Pipeline {
    Pipeline::new(
        "user sync",
        object(json!({"source": "webhook"})),
        vec![
            Step::new(
                "trigger",
                StepType::Trigger,
                INTEGRATION,
                "passthrough",
                Default::default(),
                0,
            ),
            Step::new(
                "map user fields",
                StepType::Action,
                INTEGRATION,
                "rename",
                object(json!({"mapping": {"user_id": "id", "user_name": "name"}})),
                1,
            ),
        ],
    )
}

#[tokio::test]
async fn field_mapping_flows_trigger_output_into_mapper() {
    let executor = PipelineExecutor::new(registry().await);
    let record = executor
        .execute(
            &mapping_pipeline(),
            json!({"user_id": 123, "user_name": "John Doe"}),
        )
        .await;

    assert!(record.is_success(), "error: {:?}", record.error);
    assert_eq!(
        record.final_output(),
        Some(&object(json!({"id": 123, "name": "John Doe"})))
    );
    // Position invariant: results line up with the normalized steps.
    let pipeline = mapping_pipeline();
    assert_eq!(record.results.len(), pipeline.steps.len());
}

#[tokio::test]
async fn crashing_action_yields_failed_record_and_live_executor() {
    let executor = PipelineExecutor::new(registry().await);
    let pipeline = Pipeline::new(
        "crashy",
        Default::default(),
        vec![Step::new(
            "boom",
            StepType::Action,
            INTEGRATION,
            "explode",
            Default::default(),
            0,
        )],
    );

    let record = executor.execute(&pipeline, json!({})).await;
    assert!(record.is_failed());
    assert_eq!(record.results.len(), 1);
    assert!(record.results[0]
        .error()
        .unwrap()
        .contains("Action executor crashed"));

    // The same executor keeps working afterwards.
    let record = executor
        .execute(
            &mapping_pipeline(),
            json!({"user_id": 1, "user_name": "x"}),
        )
        .await;
    assert!(record.is_success());
}

#[tokio::test]
async fn matched_events_route_to_the_first_matching_rule() {
    let router = EventRouter::new(vec![
        RouteRule::new(
            "lazada_pipeline_queue",
            object(json!({"path": "/api/webhook/lazada"})),
        ),
        RouteRule::default_route("inn_pipeline_queue"),
    ]);

    let event = json!({
        "source": "webhook",
        "path": "/api/webhook/lazada",
        "params": {}
    });

    let pipeline = mapping_pipeline();
    assert!(matches_pattern(&event, &pipeline.pattern));
    assert_eq!(router.route(&event).unwrap(), "lazada_pipeline_queue");

    let other = json!({"source": "webhook", "path": "/api/webhook/shopee"});
    assert_eq!(router.route(&other).unwrap(), "inn_pipeline_queue");
}

#[tokio::test]
async fn unknown_action_terminates_with_not_found_error() {
    let executor = PipelineExecutor::new(registry().await);
    let pipeline = Pipeline::new(
        "dangling",
        Default::default(),
        vec![Step::new(
            "missing",
            StepType::Action,
            INTEGRATION,
            "does.not.exist",
            Default::default(),
            0,
        )],
    );

    let record = executor.execute(&pipeline, json!({})).await;
    assert!(record.is_failed());
    assert_eq!(
        record.error,
        Some(CoreError::ActionNotFound(format!("{INTEGRATION}.does.not.exist")).to_string())
    );
}

#[tokio::test]
async fn handler_errors_surface_verbatim_in_the_record() {
    let registry = IntegrationRegistry::new();
    registry
        .register(Integration::new(INTEGRATION, "demo").with_action(
            ActionDefinition::new(
                "reject",
                "always errors",
                handler_fn(|_| Err(CoreError::ExecutionError("upstream said no".into()))),
            ),
        ))
        .await;
    let executor = PipelineExecutor::new(Arc::new(registry));
    let pipeline = Pipeline::new(
        "rejected",
        Default::default(),
        vec![Step::new(
            "reject",
            StepType::Action,
            INTEGRATION,
            "reject",
            Default::default(),
            0,
        )],
    );

    let record = executor.execute(&pipeline, json!({})).await;
    assert!(record.is_failed());
    assert!(record.error.unwrap().contains("upstream said no"));
}
