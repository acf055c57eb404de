//!
//! Builtin integration for the Pocsync platform: the webhook trigger, an
//! HTTP client, a logger, and the field-mapping transforms.
//!

use pocsync_core::{ActionDefinition, Integration, IntegrationRegistry, JsonMap};
use serde_json::{json, Value};
use std::sync::Arc;

pub mod http;
pub mod log;
pub mod transform;
pub mod trigger;

pub use http::HttpRequest;
pub use log::LogMessage;
pub use transform::{ExtractFields, MapFields};
pub use trigger::WebhookTrigger;

/// Name of the builtin integration.
pub const BUILTIN_INTEGRATION: &str = "pocsync.builtin";

/// Action name of the webhook trigger.
pub const WEBHOOK_TRIGGER: &str = "pocsync.webhook.trigger";

/// Action name of the HTTP client.
pub const HTTP_REQUEST: &str = "pocsync.http.request";

/// Action name of the logger.
pub const LOG_MESSAGE: &str = "pocsync.log.message";

/// Action name of the source-to-target field mapper.
pub const MAP_FIELDS: &str = "pocsync.transform.map_fields";

/// Action name of the whitelist field extractor.
pub const EXTRACT_FIELDS: &str = "pocsync.transform.extract_fields";

fn schema(value: Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}

/// Assemble the builtin integration with every action registered under its
/// canonical name.
pub fn builtin_integration() -> Integration {
    Integration::new(BUILTIN_INTEGRATION, "Builtin Pocsync actions")
        .with_action(
            ActionDefinition::new(
                WEBHOOK_TRIGGER,
                "Passes the triggering event data to the first step",
                Arc::new(WebhookTrigger::new()),
            )
            .with_output_schema(schema(json!({"type": "object"}))),
        )
        .with_action(
            ActionDefinition::new(
                HTTP_REQUEST,
                "Sends an HTTP request and returns the response",
                Arc::new(HttpRequest::new()),
            )
            .with_input_schema(schema(json!({
                "required": ["url"],
                "properties": {
                    "url": {"type": "string"},
                    "method": {"type": "string"},
                    "headers": {"type": "object"},
                    "body": {}
                }
            })))
            .with_output_schema(schema(json!({
                "properties": {
                    "status_code": {"type": "integer"},
                    "success": {"type": "boolean"},
                    "headers": {"type": "object"},
                    "body": {}
                }
            }))),
        )
        .with_action(
            ActionDefinition::new(
                LOG_MESSAGE,
                "Writes a message to the platform log",
                Arc::new(LogMessage::new()),
            )
            .with_input_schema(schema(json!({
                "properties": {
                    "level": {"type": "string"},
                    "message": {"type": "string"}
                }
            }))),
        )
        .with_action(
            ActionDefinition::new(
                MAP_FIELDS,
                "Projects input fields through a source-to-target mapping",
                Arc::new(MapFields::new()),
            )
            .with_input_schema(schema(json!({
                "required": ["mapping"],
                "properties": {"mapping": {"type": "object"}}
            }))),
        )
        .with_action(
            ActionDefinition::new(
                EXTRACT_FIELDS,
                "Projects a whitelist of input fields into the output",
                Arc::new(ExtractFields::new()),
            )
            .with_input_schema(schema(json!({
                "required": ["fields"],
                "properties": {"fields": {"type": "array"}}
            }))),
        )
}

/// Register the builtin integration on a registry.
pub async fn register_builtin(registry: &IntegrationRegistry) {
    registry.register(builtin_integration()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_builtin_exposes_every_action() {
        let registry = IntegrationRegistry::new();
        register_builtin(&registry).await;

        for action in [
            WEBHOOK_TRIGGER,
            HTTP_REQUEST,
            LOG_MESSAGE,
            MAP_FIELDS,
            EXTRACT_FIELDS,
        ] {
            assert!(
                registry.get_action(BUILTIN_INTEGRATION, action).await.is_some(),
                "expected builtin action {action}"
            );
        }

        let summaries = registry.list_integrations().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].name, BUILTIN_INTEGRATION);
        assert_eq!(summaries[0].action_count, 5);
    }

    #[tokio::test]
    async fn test_registration_is_idempotent() {
        let registry = IntegrationRegistry::new();
        register_builtin(&registry).await;
        register_builtin(&registry).await;

        assert_eq!(registry.list_integrations().await.len(), 1);
    }
}
