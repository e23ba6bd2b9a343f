//! Per-section evidence retrieval.
//!
//! For each [`SectionQuery`] in catalogue order the retriever embeds the
//! query, ranks every chunk against it, and greedily keeps the best chunks
//! while allowing at most one chunk per source file. A file may still show
//! up under several different sections.

use std::collections::HashSet;

use crate::embedding::Embedder;
use crate::error::Result;
use crate::models::{EmbeddedChunk, Retrieved, Snippet};
use crate::similarity::{rank, ScoringMode};

/// Default number of snippets kept per section.
pub const DEFAULT_TOP_K: usize = 6;

/// A documentation topic and the natural-language description used to find evidence for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionQuery {
    pub key: &'static str,
    pub query: &'static str,
}

/// The fixed, ordered topic catalogue. Keys match the DocPack's top-level sections.
pub const SECTION_QUERIES: &[SectionQuery] = &[
    SectionQuery {
        key: "summary",
        query: "What does this project do? high-level purpose and one-liner.",
    },
    SectionQuery {
        key: "features",
        query: "List of notable features or capabilities from code and README.",
    },
    SectionQuery {
        key: "how_to_run",
        query: "How to install dependencies and run the app locally from files.",
    },
    SectionQuery {
        key: "tech_stack",
        query: "Languages, frameworks, libraries and tools used.",
    },
    SectionQuery {
        key: "architecture",
        query: "Architecture overview and key components/modules.",
    },
    SectionQuery {
        key: "security_notes",
        query: "Security and privacy considerations; secrets; unsafe patterns.",
    },
    SectionQuery {
        key: "limitations",
        query: "Known limitations, TODOs, and missing pieces.",
    },
];

/// Retrieval tuning, fixed at construction time.
#[derive(Debug, Clone)]
pub struct RetrieverParams {
    /// Maximum snippets per section.
    pub top_k: usize,
    /// Ranking function. Defaults to unnormalized dot product.
    pub scoring: ScoringMode,
    pub queries: Vec<SectionQuery>,
}

impl Default for RetrieverParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            scoring: ScoringMode::Dot,
            queries: SECTION_QUERIES.to_vec(),
        }
    }
}

pub struct SectionRetriever {
    params: RetrieverParams,
}

impl SectionRetriever {
    pub fn new(params: RetrieverParams) -> Self {
        Self { params }
    }

    /// Retrieve evidence for every section, sequentially and in catalogue order.
    ///
    /// Issues exactly one embedding call per section; the first failure aborts.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        chunks: &[EmbeddedChunk],
    ) -> Result<Vec<Retrieved>> {
        let mut results = Vec::with_capacity(self.params.queries.len());

        for section in &self.params.queries {
            let query_vec = embedder.embed_one(section.query).await?;
            let mismatched = dimension_mismatches(query_vec.len(), chunks);
            if mismatched > 0 {
                tracing::warn!(
                    section = section.key,
                    query_dims = query_vec.len(),
                    mismatched,
                    "query embedding dimension differs from chunk embeddings"
                );
            }
            let snippets = self.select(&query_vec, chunks);
            tracing::debug!(
                section = section.key,
                snippets = snippets.len(),
                "retrieved section evidence"
            );
            results.push(Retrieved {
                section_key: section.key.to_string(),
                snippets,
            });
        }

        Ok(results)
    }

    /// Rank `chunks` against `query_vec` and keep the top-K with distinct file paths.
    pub fn select(&self, query_vec: &[f32], chunks: &[EmbeddedChunk]) -> Vec<Snippet> {
        let mut picked = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for scored in rank(query_vec, chunks, self.params.scoring) {
            if picked.len() >= self.params.top_k {
                break;
            }
            let chunk = &scored.item.chunk;
            if !seen.insert(chunk.file_path.as_str()) {
                continue;
            }
            picked.push(Snippet::from(chunk));
        }

        picked
    }
}

/// Count chunks whose embedding length is not `dims`.
fn dimension_mismatches(dims: usize, chunks: &[EmbeddedChunk]) -> usize {
    chunks.iter().filter(|c| c.embedding.len() != dims).count()
}
