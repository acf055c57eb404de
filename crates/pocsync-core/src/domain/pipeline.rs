use crate::types::JsonMap;
use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a step within its pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Entry step bound to the triggering event
    Trigger,

    /// Regular mid-pipeline action
    Action,

    /// Terminal step delivering the pipeline's result
    Output,
}

/// Lifecycle status of a pipeline definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Authored but not yet enabled
    Draft,

    /// Eligible for event matching
    Active,

    /// Disabled without deletion
    Inactive,
}

/// A single position in a pipeline, binding static inputs to an action
/// reference. Steps are value types: "updating" one produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 16-character identifier assigned at creation
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Step role
    #[serde(rename = "type")]
    pub step_type: StepType,

    /// Integration the action belongs to
    pub integration_name: String,

    /// Action resolved through the registry at execution time
    pub action_name: String,

    /// Static inputs authored into the pipeline definition
    #[serde(default)]
    pub input_map: JsonMap,

    /// Zero-based order within the pipeline
    pub position: u32,
}

impl Step {
    /// Create a step with a freshly generated id.
    pub fn new(
        name: impl Into<String>,
        step_type: StepType,
        integration_name: impl Into<String>,
        action_name: impl Into<String>,
        input_map: JsonMap,
        position: u32,
    ) -> Self {
        Self {
            id: generate_step_id(),
            name: name.into(),
            step_type,
            integration_name: integration_name.into(),
            action_name: action_name.into(),
            input_map,
            position,
        }
    }

    /// Return a copy of this step at a different position.
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

/// Generate a 16-character step identifier.
pub fn generate_step_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

/// A named, ordered list of steps guarded by a pattern that decides whether
/// an event triggers it. Immutable once created; mutators return new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Structural filter matched against incoming events; an empty pattern
    /// matches any event
    #[serde(default)]
    pub pattern: JsonMap,

    /// Steps in authored order
    pub steps: Vec<Step>,

    /// Lifecycle status
    pub status: PipelineStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Pipeline {
    /// Create a draft pipeline with normalized step positions.
    pub fn new(name: impl Into<String>, pattern: JsonMap, steps: Vec<Step>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            pattern,
            steps,
            status: PipelineStatus::Draft,
            created_at: now,
            updated_at: now,
        }
        .normalized()
    }

    /// Return a copy with a description attached.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self.updated_at = Utc::now();
        self
    }

    /// Return a copy in a different lifecycle status.
    pub fn with_status(mut self, status: PipelineStatus) -> Self {
        self.status = status;
        self.updated_at = Utc::now();
        self
    }

    /// Return a copy whose steps are sorted by position and re-numbered so
    /// that `steps[i].position == i`.
    pub fn normalized(mut self) -> Self {
        self.steps.sort_by_key(|step| step.position);
        self.steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| step.with_position(index as u32))
            .collect();
        self
    }

    /// Validate the pipeline definition.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "Pipeline name must not be empty".to_string(),
            ));
        }

        if self.steps.is_empty() {
            return Err(CoreError::ValidationError(
                "Pipeline must have at least one step".to_string(),
            ));
        }

        let mut positions = std::collections::HashSet::new();
        for step in &self.steps {
            if step.integration_name.trim().is_empty() || step.action_name.trim().is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Step {} is missing an action reference",
                    step.id
                )));
            }
            if !positions.insert(step.position) {
                return Err(CoreError::ValidationError(format!(
                    "Duplicate step position: {}",
                    step.position
                )));
            }
        }

        Ok(())
    }

    /// Whether the pipeline passes validation.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
