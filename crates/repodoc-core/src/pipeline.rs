//! The in-memory RAG pipeline: files in, validated [`DocPack`] out.
//!
//! All state (chunks, embeddings, retrieved evidence) is owned by a single
//! [`DocPipeline::run`] call and dropped when it returns. Network calls are
//! issued strictly one at a time: chunk embeddings in chunk order, then one
//! query embedding per section in catalogue order, then one or two
//! generation calls.

use crate::chunk::{chunk_all, ChunkParams};
use crate::embedding::{embed_chunks, Embedder};
use crate::error::Result;
use crate::generate::{GeneratorParams, StructuredGenerator, TextGenerator};
use crate::models::{DocMeta, DocPack, FileEntry};
use crate::retrieve::{RetrieverParams, SectionRetriever};
use crate::schema::SchemaValidator;

/// Immutable configuration for every pipeline stage.
#[derive(Debug, Clone, Default)]
pub struct PipelineParams {
    pub chunking: ChunkParams,
    pub retrieval: RetrieverParams,
    pub generation: GeneratorParams,
}

pub struct DocPipeline {
    chunking: ChunkParams,
    retriever: SectionRetriever,
    generator: StructuredGenerator,
}

impl DocPipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self {
            chunking: params.chunking,
            retriever: SectionRetriever::new(params.retrieval),
            generator: StructuredGenerator::new(params.generation, SchemaValidator::doc_pack()),
        }
    }

    /// Chunk, embed, retrieve, and generate. The first error aborts the run.
    pub async fn run(
        &self,
        embedder: &dyn Embedder,
        llm: &dyn TextGenerator,
        files: &[FileEntry],
        meta: DocMeta,
    ) -> Result<DocPack> {
        let chunks = chunk_all(files, &self.chunking);
        tracing::info!(files = files.len(), chunks = chunks.len(), "chunked repository");

        let embedded = embed_chunks(embedder, chunks).await?;
        tracing::info!(chunks = embedded.len(), model = embedder.model_name(), "embedded chunks");

        let retrieved = self.retriever.retrieve(embedder, &embedded).await?;
        let snippets: usize = retrieved.iter().map(|r| r.snippets.len()).sum();
        tracing::info!(sections = retrieved.len(), snippets, "retrieved evidence");

        self.generator.generate(llm, meta, &retrieved).await
    }
}
