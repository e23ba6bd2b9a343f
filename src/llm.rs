//! Ollama generation client.
//!
//! Sends `POST {url}/api/generate` with JSON-constrained output
//! (`format: "json"`, `stream: false`) and hands the raw `response` field
//! back to the core generator, which parses and validates it.

use std::time::Duration;

use async_trait::async_trait;
use repodoc_core::generate::TextGenerator;
use repodoc_core::PipelineError;
use serde_json::Value;

use crate::config::GenerationConfig;

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f64,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "format": "json",
            "stream": false,
            "options": { "temperature": self.temperature },
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<Value, PipelineError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| PipelineError::GenerationTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::GenerationCall {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let mut json: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::GenerationTransport(e.to_string()))?;
        Ok(json
            .get_mut("response")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let gen = OllamaGenerator::new(&GenerationConfig::default()).unwrap();
        let body = gen.request_body("hello");
        assert_eq!(body["model"], "qwen3:8b");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.2);
    }
}
