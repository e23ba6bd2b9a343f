//! TOML configuration parsing.
//!
//! Every section is optional; a missing file means built-in defaults.
//! Environment variables (`OLLAMA_BASE_URL`, `OLLAMA_EMBED_MODEL`,
//! `OLLAMA_LLM_MODEL`, `GITHUB_TOKEN`) override the file after parsing.
//! The GitHub token is only ever read from the environment.
//!
//! ```toml
//! [chunking]
//! chunk_size = 1200
//! chunk_overlap = 200
//!
//! [retrieval]
//! top_k = 6
//! scoring = "dot"
//!
//! [embedding]
//! url = "http://localhost:11434"
//! model = "nomic-embed-text"
//!
//! [generation]
//! model = "qwen3:8b"
//! temperature = 0.2
//! max_repair_attempts = 1
//!
//! [server]
//! bind = "127.0.0.1:3000"
//! ```

use anyhow::{bail, Context, Result};
use repodoc_core::chunk::ChunkParams;
use repodoc_core::generate::GeneratorParams;
use repodoc_core::pipeline::PipelineParams;
use repodoc_core::retrieve::RetrieverParams;
use repodoc_core::similarity::ScoringMode;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1200
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// `"dot"` (default) or `"cosine"`.
    #[serde(default)]
    pub scoring: ScoringMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            scoring: ScoringMode::default(),
        }
    }
}

fn default_top_k() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_embed_model(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}
fn default_embed_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_embed_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: usize,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_repair_attempts: default_max_repair_attempts(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

fn default_llm_model() -> String {
    "qwen3:8b".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_max_repair_attempts() -> usize {
    1
}
fn default_generation_timeout_secs() -> u64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: usize,
    #[serde(default = "default_github_api")]
    pub github_api: String,
    /// Bearer token for the archive download; populated from `GITHUB_TOKEN` only.
    #[serde(skip)]
    pub github_token: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            max_total_bytes: default_max_total_bytes(),
            github_api: default_github_api(),
            github_token: None,
        }
    }
}

fn default_max_files() -> usize {
    200
}
fn default_max_file_bytes() -> usize {
    500_000
}
fn default_max_total_bytes() -> usize {
    10_000_000
}
fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Config {
    /// Stage parameters for the core pipeline.
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams {
            chunking: ChunkParams {
                chunk_size: self.chunking.chunk_size,
                chunk_overlap: self.chunking.chunk_overlap,
            },
            retrieval: RetrieverParams {
                top_k: self.retrieval.top_k,
                scoring: self.retrieval.scoring,
                ..RetrieverParams::default()
            },
            generation: GeneratorParams {
                max_repair_attempts: self.generation.max_repair_attempts,
            },
        }
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.embedding.url = url.clone();
            self.generation.url = url;
        }
        if let Some(model) = lookup("OLLAMA_EMBED_MODEL") {
            self.embedding.model = model;
        }
        if let Some(model) = lookup("OLLAMA_LLM_MODEL") {
            self.generation.model = model;
        }
        self.source.github_token = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty());
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be > 0");
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
        }
        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            bail!("generation.temperature must be in [0.0, 2.0]");
        }
        if self.source.max_files == 0 {
            bail!("source.max_files must be > 0");
        }
        Ok(())
    }
}

/// Parse and validate a config file, without environment overrides.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load the config at `path` (defaults if it does not exist) and apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    config.apply_env(|k| std::env::var(k).ok());
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.chunking.chunk_size, 1200);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 6);
        assert_eq!(config.retrieval.scoring, ScoringMode::Dot);
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.generation.model, "qwen3:8b");
        assert_eq!(config.generation.max_repair_attempts, 1);
        assert_eq!(config.source.max_files, 200);
        assert!(config.source.github_token.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_config(
            r#"
[retrieval]
top_k = 3
scoring = "cosine"

[generation]
temperature = 0.0
"#,
        )
        .unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.scoring, ScoringMode::Cosine);
        assert_eq!(config.generation.temperature, 0.0);
        assert_eq!(config.generation.url, "http://localhost:11434");
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let err = parse_config("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse_config("[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|k| match k {
            "OLLAMA_BASE_URL" => Some("http://gpu-box:11434".to_string()),
            "OLLAMA_LLM_MODEL" => Some("llama3".to_string()),
            "GITHUB_TOKEN" => Some("ghp_x".to_string()),
            _ => None,
        });
        assert_eq!(config.embedding.url, "http://gpu-box:11434");
        assert_eq!(config.generation.url, "http://gpu-box:11434");
        assert_eq!(config.generation.model, "llama3");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.source.github_token.as_deref(), Some("ghp_x"));
    }

    #[test]
    fn test_pipeline_params() {
        let config = parse_config("[chunking]\nchunk_size = 500\nchunk_overlap = 50\n").unwrap();
        let params = config.pipeline_params();
        assert_eq!(params.chunking.chunk_size, 500);
        assert_eq!(params.retrieval.queries.len(), 7);
        assert_eq!(params.generation.max_repair_attempts, 1);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/repodoc.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }
}
