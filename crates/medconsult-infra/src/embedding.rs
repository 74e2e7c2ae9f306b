//! HTTP embedding client for OpenAI-compatible `/embeddings` endpoints.
//!
//! Implements the `Embedder` trait from `medconsult-core`. One request is
//! sent per batch; the response must carry exactly one vector per input.
//! The API key is wrapped in [`SecretString`] and only exposed when building
//! the Authorization header.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use medconsult_core::memory::box_embedder::BoxEmbedder;
use medconsult_core::memory::embedder::Embedder;
use medconsult_types::config::EmbeddingConfig;
use medconsult_types::error::EmbeddingError;

use crate::config::read_api_key;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Remote embedder speaking the OpenAI embeddings protocol.
///
/// Does not derive Debug so the key cannot leak through formatting.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    api_key: Option<SecretString>,
    api_key_env: String,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: Option<SecretString>) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| EmbeddingError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimension: config.dimension,
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

impl Embedder for HttpEmbedder {
    #[tracing::instrument(name = "embed", skip(self, texts), fields(model = %self.model, batch = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            EmbeddingError::Unavailable(format!("embedding API key missing: set {}", self.api_key_env))
        })?;

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response = self
            .client
            .post(self.url())
            .bearer_auth(api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Unavailable(format!("embedding request timed out: {e}"))
                } else {
                    EmbeddingError::Unavailable(format!("HTTP request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Unavailable(format!("HTTP {status}: {error_body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Deserialization(e.to_string()))?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::IncompleteResponse {
                requested: texts.len(),
                returned: parsed.data.len(),
            });
        }

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Build the boxed embedder from the `[embedding]` config section.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<BoxEmbedder, EmbeddingError> {
    let api_key = read_api_key(&config.api_key_env);
    if api_key.is_none() {
        tracing::warn!(env_var = %config.api_key_env, "no API key for embedding provider");
    }
    Ok(BoxEmbedder::new(HttpEmbedder::new(config, api_key)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Json;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::post;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn config(base_url: &str, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            base_url: base_url.to_string(),
            dimension,
            ..EmbeddingConfig::default()
        }
    }

    fn key() -> Option<SecretString> {
        Some(SecretString::from("sk-embed".to_string()))
    }

    #[tokio::test]
    async fn test_embed_orders_by_index_and_sends_bearer() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-embed");
                assert_eq!(body["input"].as_array().unwrap().len(), 2);
                Json(serde_json::json!({
                    "object": "list",
                    "data": [
                        {"object": "embedding", "index": 1, "embedding": [0.0, 1.0, 0.0]},
                        {"object": "embedding", "index": 0, "embedding": [1.0, 0.0, 0.0]}
                    ],
                    "model": "text-embedding-3-small"
                }))
            }),
        );
        let embedder = HttpEmbedder::new(&config(&serve(router).await, 3), key()).unwrap();

        let vectors = embedder
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
    }

    #[tokio::test]
    async fn test_short_batch_is_incomplete() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                Json(serde_json::json!({"data": [{"index": 0, "embedding": [1.0]}]}))
            }),
        );
        let embedder = HttpEmbedder::new(&config(&serve(router).await, 1), key()).unwrap();

        let err = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::IncompleteResponse { requested: 2, returned: 1 }
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "overloaded") }),
        );
        let embedder = HttpEmbedder::new(&config(&serve(router).await, 3), key()).unwrap();

        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        match err {
            EmbeddingError::Unavailable(msg) => assert!(msg.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected_by_box_wrapper() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async {
                Json(serde_json::json!({"data": [{"index": 0, "embedding": [1.0, 2.0]}]}))
            }),
        );
        let embedder = BoxEmbedder::new(
            HttpEmbedder::new(&config(&serve(router).await, 3), key()).unwrap(),
        );

        let err = embedder.embed_one("text").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let embedder = HttpEmbedder::new(&config("http://127.0.0.1:9", 3), None).unwrap();
        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Unavailable(_)));
    }
}
