//! End-to-end documentation requests.
//!
//! [`DocService`] wires acquisition, the core pipeline, and rendering
//! together. It owns no per-request state: every call builds its own
//! chunks and embeddings and drops them when it returns.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use repodoc_core::embedding::Embedder;
use repodoc_core::generate::TextGenerator;
use repodoc_core::pipeline::DocPipeline;
use repodoc_core::{DocMeta, DocPack, FileEntry};
use serde::Serialize;

use crate::config::Config;
use crate::embedding::OllamaEmbedder;
use crate::llm::OllamaGenerator;
use crate::render::{markdown_to_html, render_readme_markdown};
use crate::source::{extract_text_files, fetch_zipball, parse_github_url, scan_local_dir, SourceLimits};

/// Successful response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResponse {
    pub doc_pack: DocPack,
    pub readme_markdown: String,
    pub readme_html: String,
    pub meta: DocMeta,
}

pub struct DocService {
    config: Arc<Config>,
    http: reqwest::Client,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn TextGenerator>,
    pipeline: DocPipeline,
}

impl DocService {
    /// Build a service backed by Ollama for embeddings and generation.
    pub fn new(config: Config) -> Result<Self> {
        let embedder = Arc::new(OllamaEmbedder::new(&config.embedding)?);
        let llm = Arc::new(OllamaGenerator::new(&config.generation)?);
        Ok(Self::with_backends(config, embedder, llm))
    }

    /// Build a service with caller-supplied model backends.
    pub fn with_backends(
        config: Config,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn TextGenerator>,
    ) -> Self {
        let pipeline = DocPipeline::new(config.pipeline_params());
        Self {
            config: Arc::new(config),
            http: reqwest::Client::new(),
            embedder,
            llm,
            pipeline,
        }
    }

    /// Document a GitHub repository given its URL.
    pub async fn generate_from_url(&self, url: &str) -> Result<GenerateResponse> {
        let repo_ref = parse_github_url(url)?;
        tracing::info!(owner = %repo_ref.owner, repo = %repo_ref.repo, git_ref = %repo_ref.git_ref, "fetching repository");

        let source = &self.config.source;
        let zip = fetch_zipball(
            &self.http,
            &source.github_api,
            &repo_ref,
            source.github_token.as_deref(),
        )
        .await?;
        let extracted = extract_text_files(&zip, SourceLimits::from(source))?;
        tracing::info!(files = extracted.files.len(), "extracted text files");

        let meta = new_meta(
            &repo_ref.owner,
            &repo_ref.repo,
            &repo_ref.git_ref,
            extracted.commit_sha,
        );
        self.generate_from_files(&extracted.files, meta).await
    }

    /// Document a local checkout.
    pub async fn generate_from_dir(&self, root: &Path, meta: DocMeta) -> Result<GenerateResponse> {
        let files = scan_local_dir(root, SourceLimits::from(&self.config.source))?;
        tracing::info!(root = %root.display(), files = files.len(), "scanned local directory");
        self.generate_from_files(&files, meta).await
    }

    /// Run the pipeline over already-extracted files and render the result.
    pub async fn generate_from_files(&self, files: &[FileEntry], meta: DocMeta) -> Result<GenerateResponse> {
        if files.is_empty() {
            bail!("No eligible text files found after filtering.");
        }

        let doc_pack = self
            .pipeline
            .run(self.embedder.as_ref(), self.llm.as_ref(), files, meta.clone())
            .await?;

        let readme_markdown = render_readme_markdown(&doc_pack);
        let readme_html = markdown_to_html(&readme_markdown);

        Ok(GenerateResponse {
            doc_pack,
            readme_markdown,
            readme_html,
            meta,
        })
    }
}

/// Metadata for a run starting now.
pub fn new_meta(owner: &str, repo: &str, git_ref: &str, commit_sha: Option<String>) -> DocMeta {
    DocMeta {
        owner: owner.to_string(),
        repo: repo.to_string(),
        git_ref: git_ref.to_string(),
        commit_sha,
        generated_at_iso: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_meta_timestamp_is_rfc3339() {
        let meta = new_meta("octo", "demo", "HEAD", None);
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.generated_at_iso).is_ok());
        assert!(meta.generated_at_iso.ends_with('Z'));
    }
}
