//! Process-wide store mapping `(integration, action)` name pairs to action
//! definitions. Read-heavy; writers are rare and serialize against each
//! other.

use crate::types::JsonMap;
use crate::ActionHandler;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An immutable action entry: the callable plus its descriptive schemas.
#[derive(Clone)]
pub struct ActionDefinition {
    /// Action name, unique within its integration
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// The callable invoked with the assembled input map
    pub handler: Arc<dyn ActionHandler>,

    /// Opaque descriptive schema for the input map
    pub input_schema: JsonMap,

    /// Opaque descriptive schema for the output map
    pub output_schema: JsonMap,
}

impl ActionDefinition {
    /// Create a definition with empty schemas.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            handler,
            input_schema: JsonMap::new(),
            output_schema: JsonMap::new(),
        }
    }

    /// Return a copy with the given input schema.
    pub fn with_input_schema(mut self, schema: JsonMap) -> Self {
        self.input_schema = schema;
        self
    }

    /// Return a copy with the given output schema.
    pub fn with_output_schema(mut self, schema: JsonMap) -> Self {
        self.output_schema = schema;
        self
    }
}

impl fmt::Debug for ActionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A namespace of related actions.
#[derive(Debug, Clone)]
pub struct Integration {
    /// Integration name, unique within the registry
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Actions keyed by name
    pub actions: HashMap<String, ActionDefinition>,
}

impl Integration {
    /// Create an empty integration.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            actions: HashMap::new(),
        }
    }

    /// Return a copy with an action added, replacing any action of the same
    /// name.
    pub fn with_action(mut self, definition: ActionDefinition) -> Self {
        self.actions.insert(definition.name.clone(), definition);
        self
    }
}

/// Snapshot row returned by [`IntegrationRegistry::list_integrations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationSummary {
    /// Integration name
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// Number of registered actions
    pub action_count: usize,
}

/// The process-wide integration store.
///
/// Lives for the process lifetime; later registrations are visible to
/// subsequent lookups but callers must tolerate eventual visibility across
/// tasks.
#[derive(Debug, Default)]
pub struct IntegrationRegistry {
    integrations: RwLock<HashMap<String, Integration>>,
}

impl IntegrationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an integration, replacing any previous registration under
    /// the same name. Idempotent.
    pub async fn register(&self, integration: Integration) {
        let mut integrations = self.integrations.write().await;
        integrations.insert(integration.name.clone(), integration);
    }

    /// Look up one action by `(integration, action)` name pair.
    pub async fn get_action(&self, integration: &str, action: &str) -> Option<ActionDefinition> {
        let integrations = self.integrations.read().await;
        integrations
            .get(integration)
            .and_then(|entry| entry.actions.get(action))
            .cloned()
    }

    /// Look up a full integration by name.
    pub async fn get_integration(&self, name: &str) -> Option<Integration> {
        self.integrations.read().await.get(name).cloned()
    }

    /// Snapshot of every registered integration.
    pub async fn list_integrations(&self) -> Vec<IntegrationSummary> {
        let integrations = self.integrations.read().await;
        let mut summaries: Vec<_> = integrations
            .values()
            .map(|entry| IntegrationSummary {
                name: entry.name.clone(),
                description: entry.description.clone(),
                action_count: entry.actions.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Snapshot of the actions of one integration; empty when the
    /// integration is absent.
    pub async fn list_actions(&self, integration: &str) -> Vec<ActionDefinition> {
        let integrations = self.integrations.read().await;
        integrations
            .get(integration)
            .map(|entry| {
                let mut actions: Vec<_> = entry.actions.values().cloned().collect();
                actions.sort_by(|a, b| a.name.cmp(&b.name));
                actions
            })
            .unwrap_or_default()
    }
}
