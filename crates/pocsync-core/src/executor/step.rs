//! Executes one step: resolves its action through the registry, assembles
//! the input map, invokes the handler on an isolated task, and wraps the
//! outcome as a [`StepResult`].

use crate::domain::execution::StepResult;
use crate::domain::pipeline::Step;
use crate::registry::{ActionDefinition, IntegrationRegistry};
use crate::types::{non_empty_object, JsonMap};
use crate::CoreError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Input keys whose lowercased name marks them as sensitive.
const SENSITIVE_KEY_FRAGMENTS: [&str; 5] = ["password", "token", "secret", "key", "auth"];

/// Placeholder substituted for redacted values.
const REDACTED: &str = "[REDACTED]";

/// Resolves and invokes one action per step.
#[derive(Clone)]
pub struct StepExecutor {
    registry: Arc<IntegrationRegistry>,
}

impl StepExecutor {
    /// Create a step executor over the given registry.
    pub fn new(registry: Arc<IntegrationRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one step.
    ///
    /// `pipeline_data` is the upstream output feeding this step (the initial
    /// context for the first step); `context` is the accumulated execution
    /// context. Never returns an error: every outcome, including a panicking
    /// handler, is materialized as a [`StepResult`].
    pub async fn execute(&self, step: &Step, pipeline_data: &Value, context: &Value) -> StepResult {
        let started = Instant::now();

        let definition = match self
            .registry
            .get_action(&step.integration_name, &step.action_name)
            .await
        {
            Some(definition) => definition,
            None => {
                let error = CoreError::ActionNotFound(format!(
                    "{}.{}",
                    step.integration_name, step.action_name
                ));
                return failure_result(step, error.to_string(), started, None);
            }
        };

        let input = assemble_input(step, pipeline_data, context);
        debug!(
            step = %step.name,
            action = %step.action_name,
            "invoking action"
        );

        let handler = definition.handler.clone();
        let task_input = Value::Object(input.clone());
        let outcome = tokio::spawn(async move { handler.call(task_input).await }).await;

        match outcome {
            Ok(Ok(Value::Object(output))) => StepResult::Success {
                step_id: step.id.clone(),
                step_name: step.name.clone(),
                step_type: step.step_type,
                integration: step.integration_name.clone(),
                action: step.action_name.clone(),
                output,
                duration_ms: started.elapsed().as_millis() as u64,
                executed_at: Utc::now(),
            },
            Ok(Ok(_)) => failure_result(
                step,
                "Unexpected return value".to_string(),
                started,
                Some(redact_sensitive(&input)),
            ),
            Ok(Err(error)) => failure_result(
                step,
                error.to_string(),
                started,
                Some(redact_sensitive(&input)),
            ),
            Err(join_error) => failure_result(
                step,
                format!("Action executor crashed: {}", panic_description(join_error)),
                started,
                Some(redact_sensitive(&input)),
            ),
        }
    }
}

/// Assemble the input map for a step. Later keys win:
///
/// 1. the step's static `input_map`,
/// 2. `pipeline_data` and `context` under those names,
/// 3. the top-level keys of `pipeline_data` when it is a non-empty object,
///    so actions can read upstream fields directly.
pub fn assemble_input(step: &Step, pipeline_data: &Value, context: &Value) -> JsonMap {
    let mut input = step.input_map.clone();
    input.insert("pipeline_data".to_string(), pipeline_data.clone());
    input.insert("context".to_string(), context.clone());

    if let Some(upstream) = non_empty_object(pipeline_data) {
        for (key, value) in upstream {
            input.insert(key.clone(), value.clone());
        }
    }

    input
}

/// Best-effort input validation against an action's descriptive schema.
///
/// When `input_schema.required` lists field names, each must be present in
/// the input; otherwise this is a no-op. The step executor never calls this
/// automatically.
pub fn validate_input(definition: &ActionDefinition, input: &JsonMap) -> Result<(), CoreError> {
    let Some(required) = definition
        .input_schema
        .get("required")
        .and_then(Value::as_array)
    else {
        return Ok(());
    };

    for field in required.iter().filter_map(Value::as_str) {
        if !input.contains_key(field) {
            return Err(CoreError::ValidationError(format!(
                "Missing required field: {field}"
            )));
        }
    }

    Ok(())
}

/// Replace the value of every top-level key whose lowercased name contains a
/// sensitive fragment.
pub fn redact_sensitive(input: &JsonMap) -> JsonMap {
    input
        .iter()
        .map(|(key, value)| {
            let lowered = key.to_lowercase();
            if SENSITIVE_KEY_FRAGMENTS
                .iter()
                .any(|fragment| lowered.contains(fragment))
            {
                (key.clone(), Value::String(REDACTED.to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

fn failure_result(
    step: &Step,
    error: String,
    started: Instant,
    input_data: Option<JsonMap>,
) -> StepResult {
    StepResult::Failure {
        step_id: step.id.clone(),
        step_name: step.name.clone(),
        step_type: step.step_type,
        integration: step.integration_name.clone(),
        action: step.action_name.clone(),
        error,
        duration_ms: started.elapsed().as_millis() as u64,
        failed_at: Utc::now(),
        input_data,
    }
}

fn panic_description(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
