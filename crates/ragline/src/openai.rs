//! `OpenAI`-compatible embeddings client.
//!
//! Sends one `POST {base_url}/embeddings` per batch. Failures surface as
//! [`EmbeddingError::Http`] (transport) or [`EmbeddingError::Provider`]
//! (non-2xx); there is no retry or backoff here. Timeouts come from the
//! configured `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EmbeddingConfig;
use crate::errors::{EmbeddingError, Result};
use crate::service::EmbeddingService;

/// Embedding service backed by an `OpenAI`-compatible HTTP API.
#[derive(Clone)]
pub struct OpenAiEmbeddingService {
    client: reqwest::Client,
    endpoint: String,
    dimensions: Option<usize>,
}

impl OpenAiEmbeddingService {
    /// Build a client for `base_url` authenticated with `api_key`.
    pub fn new(
        api_key: &str,
        base_url: &str,
        dimensions: Option<usize>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::Config("missing OpenAI API key".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(Self::build_headers(api_key)?)
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            dimensions,
        })
    }

    /// Build a client from config, reading the key from `config.api_key_env`.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EmbeddingError::Config(format!("{} is not set", config.api_key_env))
        })?;
        Self::new(
            &api_key,
            &config.base_url,
            config.dimensions,
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_headers(api_key: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|_| EmbeddingError::Config("invalid OpenAI API key".into()))?;
        let _ = headers.insert(AUTHORIZATION, auth);
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

/// Extract `(message, code)` from an error response body.
fn parse_api_error(body: &str, status: u16) -> (String, Option<String>) {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        let code = error["code"]
            .as_str()
            .or_else(|| error["type"].as_str())
            .map(String::from);
        (message, code)
    } else {
        (format!("HTTP {status}: {body}"), None)
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingService {
    async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model,
            input: texts,
            dimensions: self.dimensions,
        };
        debug!(endpoint = %self.endpoint, model, inputs = texts.len(), "requesting embeddings");

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, code) = parse_api_error(&body, status.as_u16());
            return Err(EmbeddingError::Provider {
                status: status.as_u16(),
                message,
                code,
            });
        }

        let body = response.bytes().await?;
        let mut parsed: EmbeddingResponse = serde_json::from_slice(&body)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;
        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "{} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        // After sorting, indices must be exactly 0..n.
        if let Some((position, entry)) = parsed
            .data
            .iter()
            .enumerate()
            .find(|(position, entry)| entry.index != *position)
        {
            return Err(EmbeddingError::MalformedResponse(format!(
                "embedding index {} at position {position}",
                entry.index
            )));
        }
        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, dimensions: Option<usize>) -> OpenAiEmbeddingService {
        OpenAiEmbeddingService::new(
            "sk-test",
            &format!("{}/v1/", server.uri()),
            dimensions,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    // ── construction ─────────────────────────────────────────────────

    #[test]
    fn empty_key_rejected() {
        let result =
            OpenAiEmbeddingService::new("  ", "http://localhost", None, Duration::from_secs(1));
        assert!(matches!(result, Err(EmbeddingError::Config(_))));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let svc = OpenAiEmbeddingService::new(
            "sk",
            "https://api.openai.com/v1/",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(svc.endpoint(), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn from_config_missing_env_var() {
        let config = EmbeddingConfig {
            api_key_env: "RAGLINE_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..EmbeddingConfig::default()
        };
        let err = OpenAiEmbeddingService::from_config(&config)
            .err()
            .expect("should fail");
        assert!(err.to_string().contains("RAGLINE_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    // ── parse_api_error ──────────────────────────────────────────────

    #[test]
    fn parse_api_error_json() {
        let body = r#"{"error":{"type":"invalid_request_error","code":"invalid_api_key","message":"Incorrect API key"}}"#;
        let (msg, code) = parse_api_error(body, 401);
        assert_eq!(msg, "Incorrect API key");
        assert_eq!(code.as_deref(), Some("invalid_api_key"));
    }

    #[test]
    fn parse_api_error_type_fallback() {
        let body = r#"{"error":{"type":"server_error","message":"oops"}}"#;
        let (_, code) = parse_api_error(body, 500);
        assert_eq!(code.as_deref(), Some("server_error"));
    }

    #[test]
    fn parse_api_error_non_json() {
        let (msg, code) = parse_api_error("Bad Gateway", 502);
        assert_eq!(msg, "HTTP 502: Bad Gateway");
        assert!(code.is_none());
    }

    // ── mock server ──────────────────────────────────────────────────

    #[tokio::test]
    async fn embed_sends_batch_and_orders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "text-embedding-ada-002",
                "input": ["first", "second"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0]}
                ],
                "model": "text-embedding-ada-002",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vectors = service(&server, None)
            .embed(
                "text-embedding-ada-002",
                &["first".to_string(), "second".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn embed_sends_dimensions_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "input": ["hello"],
                "dimensions": 2
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.6, 0.8]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = service(&server, Some(2))
            .embed_single("text-embedding-3-small", "hello")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.6, 0.8]);
    }

    #[tokio::test]
    async fn error_status_maps_to_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "requests", "code": "rate_limit_exceeded", "message": "Rate limit reached"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = service(&server, None)
            .embed_single("m", "hello")
            .await
            .unwrap_err();
        match err {
            EmbeddingError::Provider {
                status,
                message,
                code,
            } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached");
                assert_eq!(code.as_deref(), Some("rate_limit_exceeded"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let err = service(&server, None)
            .embed_single("m", "hello")
            .await
            .unwrap_err();
        assert!(err.is_provider_error());
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn count_mismatch_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let err = service(&server, None)
            .embed("m", &["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn duplicate_index_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 0, "embedding": [1.0, 0.0]},
                    {"index": 0, "embedding": [0.0, 1.0]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = service(&server, None)
            .embed("m", &["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::MalformedResponse(_)));
        assert!(err.is_provider_error());
    }

    #[tokio::test]
    async fn out_of_range_index_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"index": 0, "embedding": [1.0]},
                    {"index": 5, "embedding": [2.0]}
                ]
            })))
            .mount(&server)
            .await;

        let err = service(&server, None)
            .embed("m", &["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("index 5"));
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = service(&server, None)
            .embed_single("m", "a")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        let svc = OpenAiEmbeddingService::new(
            "sk",
            "http://127.0.0.1:9",
            None,
            Duration::from_millis(500),
        )
        .unwrap();
        let err = svc.embed_single("m", "a").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Http(_)));
        assert!(err.is_provider_error());
    }
}
