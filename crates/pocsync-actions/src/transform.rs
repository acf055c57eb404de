use async_trait::async_trait;
use pocsync_core::{ActionHandler, CoreError, JsonMap};
use serde_json::Value;

/// Projects input fields through a static `{source: target}` mapping.
///
/// Only mapped fields appear in the output; sources absent from the input
/// are skipped silently.
#[derive(Debug, Default)]
pub struct MapFields;

impl MapFields {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for MapFields {
    async fn call(&self, input: Value) -> Result<Value, CoreError> {
        let mapping = input
            .get("mapping")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                CoreError::ValidationError("mapping input must be an object".to_string())
            })?;

        let mut output = JsonMap::new();
        for (source, target) in mapping {
            let target = target.as_str().ok_or_else(|| {
                CoreError::ValidationError(format!(
                    "mapping target for '{source}' must be a string"
                ))
            })?;
            if let Some(value) = input.get(source) {
                output.insert(target.to_string(), value.clone());
            }
        }

        Ok(Value::Object(output))
    }
}

/// Projects a whitelist of input fields into the output unchanged.
#[derive(Debug, Default)]
pub struct ExtractFields;

impl ExtractFields {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionHandler for ExtractFields {
    async fn call(&self, input: Value) -> Result<Value, CoreError> {
        let fields = input
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                CoreError::ValidationError("fields input must be a list".to_string())
            })?;

        let mut output = JsonMap::new();
        for field in fields {
            let field = field.as_str().ok_or_else(|| {
                CoreError::ValidationError("fields entries must be strings".to_string())
            })?;
            if let Some(value) = input.get(field) {
                output.insert(field.to_string(), value.clone());
            }
        }

        Ok(Value::Object(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_map_fields_projects_sources_to_targets() {
        let action = MapFields::new();
        let output = action
            .call(json!({
                "mapping": {"user_id": "id", "user_name": "name"},
                "user_id": 123,
                "user_name": "John Doe",
                "ignored": true
            }))
            .await
            .unwrap();

        assert_eq!(output, json!({"id": 123, "name": "John Doe"}));
    }

    #[tokio::test]
    async fn test_map_fields_skips_missing_sources() {
        let action = MapFields::new();
        let output = action
            .call(json!({"mapping": {"absent": "x", "present": "y"}, "present": 1}))
            .await
            .unwrap();

        assert_eq!(output, json!({"y": 1}));
    }

    #[tokio::test]
    async fn test_map_fields_requires_object_mapping() {
        let action = MapFields::new();
        assert!(action.call(json!({"mapping": "nope"})).await.is_err());
        assert!(action.call(json!({})).await.is_err());
        assert!(action
            .call(json!({"mapping": {"a": 7}, "a": 1}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_extract_fields_keeps_whitelisted_keys() {
        let action = ExtractFields::new();
        let output = action
            .call(json!({
                "fields": ["order_id", "status", "missing"],
                "order_id": "12345",
                "status": "created",
                "noise": true
            }))
            .await
            .unwrap();

        assert_eq!(output, json!({"order_id": "12345", "status": "created"}));
    }

    #[tokio::test]
    async fn test_extract_fields_requires_string_entries() {
        let action = ExtractFields::new();
        assert!(action.call(json!({"fields": [1]})).await.is_err());
        assert!(action.call(json!({"fields": "order_id"})).await.is_err());
    }
}
