//! Ollama embedding provider.
//!
//! Calls `POST {url}/api/embeddings` with `{"model", "input"}` and reads the
//! `embedding` array from the reply. Newer Ollama builds answer with an
//! `embeddings` list instead; the first entry is used in that case.
//!
//! No retries happen here: a non-success status surfaces immediately as
//! [`PipelineError::Embedding`] with the status code and body text.

use std::time::Duration;

use async_trait::async_trait;
use repodoc_core::embedding::Embedder;
use repodoc_core::PipelineError;
use serde_json::Value;

use crate::config::EmbeddingConfig;

pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                PipelineError::EmbeddingTransport(format!(
                    "is Ollama running at {}? {}",
                    self.url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Embedding {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingTransport(e.to_string()))?;
        parse_embedding_response(&json)
    }
}

/// Extract the vector from an Ollama embedding reply.
pub fn parse_embedding_response(json: &Value) -> Result<Vec<f32>, PipelineError> {
    let embedding = json
        .get("embedding")
        .and_then(|e| e.as_array())
        .or_else(|| {
            json.get("embeddings")
                .and_then(|e| e.as_array())
                .and_then(|list| list.first())
                .and_then(|e| e.as_array())
        })
        .ok_or_else(|| {
            PipelineError::EmbeddingTransport(
                "Invalid Ollama response: missing embedding array".to_string(),
            )
        })?;

    embedding
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                PipelineError::EmbeddingTransport(format!(
                    "Invalid Ollama response: embedding[{}] is not a number",
                    i
                ))
            })
        })
        .collect()
}
