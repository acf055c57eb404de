use crate::domain::pipeline::StepType;
use crate::types::JsonMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Status of one pipeline execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// Created, not yet started
    Pending,

    /// Steps are being executed
    Running,

    /// Every step completed
    Success,

    /// Validation or a step failed
    Failed,

    /// Cancelled by an external caller
    Cancelled,
}

/// Outcome of a single step. Both variants carry the same identity keys so
/// downstream consumers can discriminate on the presence of `output` versus
/// `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepResult {
    /// The action returned an output map
    Success {
        /// Step identifier
        step_id: String,
        /// Step name
        step_name: String,
        /// Step role
        step_type: StepType,
        /// Integration the action belongs to
        integration: String,
        /// Action that was invoked
        action: String,
        /// The map the action returned
        output: JsonMap,
        /// Wall-clock time of the invocation
        duration_ms: u64,
        /// When the invocation finished
        executed_at: DateTime<Utc>,
    },

    /// The action was missing, returned an error, or crashed
    Failure {
        /// Step identifier
        step_id: String,
        /// Step name
        step_name: String,
        /// Step role
        step_type: StepType,
        /// Integration the action belongs to
        integration: String,
        /// Action that was invoked
        action: String,
        /// What went wrong
        error: String,
        /// Wall-clock time of the invocation
        duration_ms: u64,
        /// When the failure was observed
        failed_at: DateTime<Utc>,
        /// The assembled input, with sensitive keys redacted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_data: Option<JsonMap>,
    },
}

impl StepResult {
    /// Identifier of the step this result belongs to.
    pub fn step_id(&self) -> &str {
        match self {
            StepResult::Success { step_id, .. } | StepResult::Failure { step_id, .. } => step_id,
        }
    }

    /// Whether the step succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, StepResult::Success { .. })
    }

    /// The output map, for successes.
    pub fn output(&self) -> Option<&JsonMap> {
        match self {
            StepResult::Success { output, .. } => Some(output),
            StepResult::Failure { .. } => None,
        }
    }

    /// The error message, for failures.
    pub fn error(&self) -> Option<&str> {
        match self {
            StepResult::Success { .. } => None,
            StepResult::Failure { error, .. } => Some(error),
        }
    }

    /// How long the invocation took.
    pub fn duration_ms(&self) -> u64 {
        match self {
            StepResult::Success { duration_ms, .. } | StepResult::Failure { duration_ms, .. } => {
                *duration_ms
            }
        }
    }
}

/// The in-memory result of one pipeline run. Owned by the pipeline executor
/// while running, returned to the caller once terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique identifier for this run
    pub execution_id: String,

    /// Pipeline that was executed
    pub pipeline_id: String,

    /// Current status
    pub status: ExecutionStatus,

    /// When execution started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// When execution reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Accumulated execution context
    pub context: Value,

    /// Per-step results in execution order
    pub results: Vec<StepResult>,

    /// Error message for failed or cancelled runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Create a pending record for a pipeline.
    pub fn new(pipeline_id: impl Into<String>, context: Value) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            pipeline_id: pipeline_id.into(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            context,
            results: Vec::new(),
            error: None,
        }
    }

    /// Transition `pending → running`, stamping `started_at`. No-op from any
    /// other status.
    pub fn start(&mut self) {
        if self.status == ExecutionStatus::Pending {
            self.status = ExecutionStatus::Running;
            self.started_at = Some(Utc::now());
        }
    }

    /// Transition to `success`, stamping `completed_at`.
    pub fn complete(&mut self) {
        if self.status == ExecutionStatus::Running {
            self.status = ExecutionStatus::Success;
            self.completed_at = Some(Utc::now());
        }
    }

    /// Transition to `failed` with the given error, stamping `completed_at`.
    pub fn fail(&mut self, error: impl Into<String>) {
        if matches!(
            self.status,
            ExecutionStatus::Pending | ExecutionStatus::Running
        ) {
            self.status = ExecutionStatus::Failed;
            self.error = Some(error.into());
            self.completed_at = Some(Utc::now());
        }
    }

    /// Transition `running → cancelled`. A no-op on any other status;
    /// cancellation never interrupts an in-flight step.
    pub fn cancel(&mut self) {
        if self.status == ExecutionStatus::Running {
            self.status = ExecutionStatus::Cancelled;
            self.error = Some("Execution cancelled by user".to_string());
            self.completed_at = Some(Utc::now());
        }
    }

    /// Append a step result.
    pub fn push_result(&mut self, result: StepResult) {
        self.results.push(result);
    }

    /// Whether the run finished successfully.
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Whether the run failed.
    pub fn is_failed(&self) -> bool {
        self.status == ExecutionStatus::Failed
    }

    /// Whether the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status == ExecutionStatus::Cancelled
    }

    /// Wall-clock duration between start and completion.
    pub fn duration_ms(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_milliseconds().max(0) as u64)
            }
            _ => None,
        }
    }

    /// The output of the last successful step, if any.
    pub fn final_output(&self) -> Option<&JsonMap> {
        self.results
            .iter()
            .rev()
            .find_map(|result| result.output())
    }

    /// Outputs of every successful step, in order.
    pub fn all_outputs(&self) -> Vec<&JsonMap> {
        self.results
            .iter()
            .filter_map(|result| result.output())
            .collect()
    }

    /// Results of steps that failed.
    pub fn failed_steps(&self) -> Vec<&StepResult> {
        self.results
            .iter()
            .filter(|result| !result.is_success())
            .collect()
    }

    /// A small stats map suitable for logging.
    pub fn summary(&self) -> JsonMap {
        let mut summary = JsonMap::new();
        summary.insert("execution_id".to_string(), json!(self.execution_id));
        summary.insert("pipeline_id".to_string(), json!(self.pipeline_id));
        summary.insert("status".to_string(), json!(self.status));
        summary.insert("steps_executed".to_string(), json!(self.results.len()));
        summary.insert(
            "steps_failed".to_string(),
            json!(self.failed_steps().len()),
        );
        summary.insert("duration_ms".to_string(), json!(self.duration_ms()));
        summary
    }
}
