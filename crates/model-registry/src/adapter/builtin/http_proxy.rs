//! HTTP proxy adapter
//!
//! Forwards each inference to a remote model server and returns its JSON
//! object unchanged. The model artifact and the device hint are not used; the
//! remote side owns both.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::adapter::contract::*;
use crate::errors::{InferenceError, SetupError};

#[derive(Debug, Deserialize)]
struct ProxyOptions {
    url: String,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_input_field")]
    input_field: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_input_field() -> String {
    "text".to_string()
}

struct ProxyTarget {
    client: reqwest::Client,
    url: reqwest::Url,
    input_field: String,
}

#[derive(Default)]
pub struct HttpProxyAdapter {
    target: Option<ProxyTarget>,
}

impl HttpProxyAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelAdapter for HttpProxyAdapter {
    async fn setup(
        &mut self,
        _model_path: &Path,
        params: &AdapterParams,
        _device: &Device,
    ) -> Result<(), SetupError> {
        if self.target.is_some() {
            return Err(SetupError::AlreadyInitialized);
        }

        let options: ProxyOptions = params.parse()?;
        let url = reqwest::Url::parse(&options.url)
            .map_err(|e| SetupError::InvalidParams(format!("invalid url '{}': {}", options.url, e)))?;
        if options.timeout_seconds == 0 {
            return Err(SetupError::InvalidParams(
                "timeout_seconds must be positive".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| SetupError::Backend(format!("failed to build HTTP client: {}", e)))?;

        info!("http_proxy adapter forwarding to {}", url);
        self.target = Some(ProxyTarget {
            client,
            url,
            input_field: options.input_field,
        });
        Ok(())
    }

    async fn inference(&self, input: &str) -> Result<InferenceOutput, InferenceError> {
        let target = self.target.as_ref().ok_or(InferenceError::NotReady)?;

        let mut payload = serde_json::Map::new();
        payload.insert(target.input_field.clone(), Value::String(input.to_string()));

        let resp = target
            .client
            .post(target.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| InferenceError::Backend(format!("Inference request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Backend(format!(
                "Inference failed ({}): {}",
                status, body
            )));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| InferenceError::Backend(format!("Failed to parse response: {}", e)))?;

        match value {
            Value::Object(map) => Ok(map),
            other => Err(InferenceError::Backend(format!(
                "remote model returned a non-object result: {}",
                other
            ))),
        }
    }

    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            adapter: "http_proxy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            reentrant: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn params(v: Value) -> AdapterParams {
        match v {
            Value::Object(m) => AdapterParams::new(m),
            _ => AdapterParams::default(),
        }
    }

    async fn proxy_to(url: String, extra: Value) -> HttpProxyAdapter {
        let mut p = json!({ "url": url });
        if let (Some(base), Value::Object(extra)) = (p.as_object_mut(), extra) {
            base.extend(extra);
        }
        let mut adapter = HttpProxyAdapter::new();
        adapter
            .setup(Path::new("unused"), &params(p), &Device::cpu())
            .await
            .unwrap();
        adapter
    }

    #[tokio::test]
    async fn test_forwards_input_and_returns_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_body(Matcher::Json(json!({"text": "hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"label": "greeting", "score": 0.9}"#)
            .create_async()
            .await;

        let adapter = proxy_to(format!("{}/predict", server.url()), json!({})).await;
        let out = adapter.inference("hello").await.unwrap();

        assert_eq!(out["label"], "greeting");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_custom_input_field() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Json(json!({"prompt": "hi"})))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let adapter = proxy_to(server.url(), json!({"input_field": "prompt"})).await;
        let out = adapter.inference("hi").await.unwrap();

        assert_eq!(out["ok"], true);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remote_error_status_is_inference_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let adapter = proxy_to(server.url(), json!({})).await;
        match adapter.inference("x").await {
            Err(InferenceError::Backend(msg)) => assert!(msg.contains("overloaded")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_object_result_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body("[1, 2, 3]")
            .create_async()
            .await;

        let adapter = proxy_to(server.url(), json!({})).await;
        assert!(matches!(
            adapter.inference("x").await,
            Err(InferenceError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_setup_requires_valid_url() {
        let mut adapter = HttpProxyAdapter::new();
        let err = adapter
            .setup(Path::new("unused"), &params(json!({"url": "not a url"})), &Device::cpu())
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::InvalidParams(_)));

        let err = adapter
            .setup(Path::new("unused"), &AdapterParams::default(), &Device::cpu())
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::InvalidParams(_)));
    }
}
