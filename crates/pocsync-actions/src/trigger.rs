use async_trait::async_trait;
use pocsync_core::{ActionHandler, CoreError};
use serde_json::{json, Value};

/// Entry action for webhook-triggered pipelines.
///
/// Hands the triggering data through so downstream steps consume it as
/// upstream output. When that data is a full event envelope, the payload
/// under `params` is unwrapped; a bare map passes through unchanged.
#[derive(Debug, Default)]
pub struct WebhookTrigger;

impl WebhookTrigger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for WebhookTrigger {
    async fn call(&self, input: Value) -> Result<Value, CoreError> {
        let data = input
            .get("pipeline_data")
            .filter(|data| data.is_object())
            .cloned()
            .unwrap_or_else(|| json!({}));

        match data.get("params") {
            Some(Value::Object(params)) => Ok(Value::Object(params.clone())),
            _ => Ok(data),
        }
    }
}
