//! First-match routing of events onto pipeline queues.

use crate::matcher::matches_pattern;
use crate::types::JsonMap;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One routing rule: events matching `pattern` are routed to `queue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Target queue name
    pub queue: String,

    /// Structural filter; an empty pattern matches every event, which makes
    /// the final rule a default route
    #[serde(default)]
    pub pattern: JsonMap,
}

impl RouteRule {
    /// Create a rule.
    pub fn new(queue: impl Into<String>, pattern: JsonMap) -> Self {
        Self {
            queue: queue.into(),
            pattern,
        }
    }

    /// Create a default route matching every event.
    pub fn default_route(queue: impl Into<String>) -> Self {
        Self::new(queue, JsonMap::new())
    }
}

/// A static, ordered list of rules consulted in order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct EventRouter {
    rules: Vec<RouteRule>,
}

impl EventRouter {
    /// Create a router over an ordered rule list.
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Find the queue for an event.
    pub fn route(&self, event: &Value) -> Result<&str, CoreError> {
        self.rules
            .iter()
            .find(|rule| matches_pattern(event, &rule.pattern))
            .map(|rule| rule.queue.as_str())
            .ok_or(CoreError::NoMatchingRoute)
    }
}
