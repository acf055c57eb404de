use async_trait::async_trait;
use pocsync_core::{ActionHandler, CoreError};
use serde_json::{json, Value};
use tracing::{debug, error, info, trace, warn};

/// An action that writes a message to the platform log.
#[derive(Debug, Default)]
pub struct LogMessage;

impl LogMessage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for LogMessage {
    async fn call(&self, input: Value) -> Result<Value, CoreError> {
        let level = input
            .get("level")
            .and_then(Value::as_str)
            .unwrap_or("info")
            .to_lowercase();

        let message = match input.get("message") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => input
                .get("pipeline_data")
                .cloned()
                .unwrap_or(Value::Null)
                .to_string(),
        };

        match level.as_str() {
            "trace" => trace!("[pipeline] {message}"),
            "debug" => debug!("[pipeline] {message}"),
            "warn" => warn!("[pipeline] {message}"),
            "error" => error!("[pipeline] {message}"),
            _ => info!("[pipeline] {message}"),
        }

        Ok(json!({
            "logged": true,
            "level": level,
            "message": message,
        }))
    }
}
