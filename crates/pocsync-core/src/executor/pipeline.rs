//! Drives a pipeline's steps in position order, threading each step's output
//! into the next and accumulating a typed execution record.

use crate::domain::execution::{ExecutionRecord, StepResult};
use crate::domain::pipeline::Pipeline;
use crate::executor::step::StepExecutor;
use crate::registry::IntegrationRegistry;
use crate::types::{merge_into, object_or_empty, JsonMap};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared flag for cooperative cancellation.
///
/// Cancellation never interrupts an in-flight step; the executor observes
/// the flag between steps only.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    /// Create a flag in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Executes pipelines step by step. Synchronous from the caller's viewpoint:
/// `execute` returns only when the record is terminal.
#[derive(Clone)]
pub struct PipelineExecutor {
    steps: StepExecutor,
}

impl PipelineExecutor {
    /// Create a pipeline executor resolving actions through the given
    /// registry.
    pub fn new(registry: Arc<IntegrationRegistry>) -> Self {
        Self {
            steps: StepExecutor::new(registry),
        }
    }

    /// Execute a pipeline to completion.
    pub async fn execute(&self, pipeline: &Pipeline, initial_context: Value) -> ExecutionRecord {
        self.execute_cancellable(pipeline, initial_context, &CancellationFlag::new())
            .await
    }

    /// Execute a pipeline, checking `cancel` before each step.
    pub async fn execute_cancellable(
        &self,
        pipeline: &Pipeline,
        initial_context: Value,
        cancel: &CancellationFlag,
    ) -> ExecutionRecord {
        let mut record = ExecutionRecord::new(pipeline.id.clone(), initial_context.clone());
        record.start();

        if let Err(error) = pipeline.validate() {
            warn!(pipeline_id = %pipeline.id, %error, "refusing to execute invalid pipeline");
            record.fail("Pipeline validation failed");
            return record;
        }

        let mut steps = pipeline.steps.clone();
        steps.sort_by_key(|step| step.position);

        let mut context = object_or_empty(&initial_context);
        let mut prior_output: Option<JsonMap> = None;

        for (index, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(pipeline_id = %pipeline.id, step = %step.name, "execution cancelled");
                record.cancel();
                return record;
            }

            let pipeline_data = if index == 0 {
                initial_context.clone()
            } else {
                match prior_output.take() {
                    Some(output) if !output.is_empty() => Value::Object(output),
                    _ => {
                        warn!(
                            pipeline_id = %pipeline.id,
                            step = %step.name,
                            "no upstream output available, running step with empty input"
                        );
                        Value::Object(JsonMap::new())
                    }
                }
            };

            let result = self
                .steps
                .execute(step, &pipeline_data, &Value::Object(context.clone()))
                .await;

            match result {
                StepResult::Success { .. } => {
                    let output = result.output().cloned().unwrap_or_default();
                    if let Some(Value::Object(extra)) = output.get("context") {
                        merge_into(&mut context, extra);
                        record.context = Value::Object(context.clone());
                    }
                    debug!(
                        pipeline_id = %pipeline.id,
                        step = %step.name,
                        duration_ms = result.duration_ms(),
                        "step completed"
                    );
                    prior_output = Some(output);
                    record.push_result(result);
                }
                StepResult::Failure { ref error, .. } => {
                    warn!(
                        pipeline_id = %pipeline.id,
                        step = %step.name,
                        %error,
                        "step failed, terminating pipeline"
                    );
                    let error = error.clone();
                    record.push_result(result);
                    record.fail(error);
                    return record;
                }
            }
        }

        record.complete();
        record
    }
}
