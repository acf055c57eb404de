use crate::domain::pipeline::Pipeline;
use crate::types::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An inbound event as constructed by the ingress layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Origin of the event, e.g. `webhook`
    pub source: String,

    /// Full request path the event arrived on
    pub path: String,

    /// HTTP method, when the event came over HTTP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Query parameters and decoded body fields
    #[serde(default)]
    pub params: JsonMap,

    /// Request headers
    #[serde(default)]
    pub headers: JsonMap,
}

impl Event {
    /// View the event as a JSON value for pattern matching and routing.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// The envelope the event consumer places on a pipeline queue: one matched
/// pipeline paired with the event that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    /// The pipeline to execute
    pub pipeline: Pipeline,

    /// The original event, passed through as execution context
    pub context: Event,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pipeline::{Step, StepType};
    use crate::types::object_or_empty;
    use serde_json::json;

    #[test]
    fn test_event_round_trip() {
        let event = Event {
            source: "webhook".to_string(),
            path: "/api/webhook/shopee".to_string(),
            method: Some("POST".to_string()),
            params: object_or_empty(&json!({"order_id": "12345"})),
            headers: object_or_empty(&json!({"content-type": "application/json"})),
        };

        let encoded = serde_json::to_vec(&event).unwrap();
        let decoded: Event = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_event_decodes_without_optional_fields() {
        let decoded: Event =
            serde_json::from_value(json!({"source": "webhook", "path": "/x"})).unwrap();

        assert!(decoded.method.is_none());
        assert!(decoded.params.is_empty());
        assert!(decoded.headers.is_empty());
    }

    #[test]
    fn test_work_item_round_trip() {
        let pipeline = Pipeline::new(
            "orders",
            object_or_empty(&json!({"source": "webhook"})),
            vec![Step::new(
                "trigger",
                StepType::Trigger,
                "pocsync.builtin",
                "pocsync.webhook.trigger",
                JsonMap::new(),
                0,
            )],
        );
        let item = WorkItem {
            pipeline,
            context: Event {
                source: "webhook".to_string(),
                path: "/api/webhook/lazada".to_string(),
                method: Some("POST".to_string()),
                params: JsonMap::new(),
                headers: JsonMap::new(),
            },
        };

        let encoded = serde_json::to_vec(&item).unwrap();
        let decoded: WorkItem = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, item);
    }
}
