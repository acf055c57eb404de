use async_trait::async_trait;
use pocsync_core::{ActionHandler, CoreError, JsonMap};
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// An action that makes HTTP requests.
///
/// Transport-level problems (bad URL, connection failure) fail the step;
/// non-2xx responses succeed with `success: false` so pipelines can decide
/// for themselves.
#[derive(Debug)]
pub struct HttpRequest {
    client: Client,
}

impl HttpRequest {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }
}

impl Default for HttpRequest {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for HttpRequest {
    async fn call(&self, input: Value) -> Result<Value, CoreError> {
        let url = input
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::ValidationError("url input is required".to_string()))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(CoreError::ValidationError(format!("Invalid URL: {url}")));
        }

        let method_str = input
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("GET")
            .to_uppercase();
        let method = Method::from_str(&method_str).map_err(|_| {
            CoreError::ValidationError(format!("Invalid HTTP method: {method_str}"))
        })?;

        let mut request = self.client.request(method.clone(), url);

        if let Some(headers) = input.get("headers").and_then(Value::as_object) {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name, value);
                }
            }
        }

        if method != Method::GET && method != Method::HEAD {
            if let Some(body) = input.get("body") {
                request = request.json(body);
            }
        }

        debug!(%method_str, %url, "sending HTTP request");

        let response = request
            .send()
            .await
            .map_err(|error| CoreError::ExecutionError(format!("HTTP request failed: {error}")))?;

        let status = response.status();
        let headers: JsonMap = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), Value::String(value.to_string())))
            })
            .collect();

        let text = response.text().await.map_err(|error| {
            CoreError::ExecutionError(format!("Failed to read response body: {error}"))
        })?;
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => json!({"raw_body": text}),
        };

        Ok(json!({
            "status_code": status.as_u16(),
            "success": status.is_success(),
            "headers": headers,
            "body": body,
        }))
    }
}
