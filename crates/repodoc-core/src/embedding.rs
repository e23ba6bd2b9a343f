//! Embedding provider abstraction.
//!
//! The [`Embedder`] trait turns text into a dense vector. Concrete
//! providers (Ollama over HTTP) live in the `repodoc` app crate; tests use
//! deterministic in-memory fakes.
//!
//! Chunks are embedded strictly sequentially, one call per chunk in chunk
//! order, and the first failure aborts the whole batch.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, EmbeddedChunk};

/// Converts arbitrary text into a fixed-length vector.
///
/// All vectors produced within one request must share a dimension; the
/// similarity functions only compare the overlapping prefix otherwise.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"nomic-embed-text"`).
    fn model_name(&self) -> &str;

    /// Embed a single text. Fails with
    /// [`PipelineError::Embedding`](crate::PipelineError::Embedding) on a
    /// non-success response.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embed every chunk in order, one call at a time.
pub async fn embed_chunks(embedder: &dyn Embedder, chunks: Vec<Chunk>) -> Result<Vec<EmbeddedChunk>> {
    let total = chunks.len();
    let mut out = Vec::with_capacity(total);
    let mut dims: Option<usize> = None;

    for (i, chunk) in chunks.into_iter().enumerate() {
        let embedding = embedder.embed_one(&chunk.text).await?;

        match dims {
            None => dims = Some(embedding.len()),
            Some(d) if d != embedding.len() => {
                tracing::warn!(
                    chunk = %chunk.id,
                    expected = d,
                    got = embedding.len(),
                    "embedding dimension mismatch"
                );
            }
            _ => {}
        }

        if (i + 1) % 50 == 0 || i + 1 == total {
            tracing::debug!(done = i + 1, total, "embedded chunks");
        }
        out.push(EmbeddedChunk { chunk, embedding });
    }

    Ok(out)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic fakes shared by the core test suites.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::PipelineError;

    /// Counts keyword occurrences into a vector; identical text gives identical vectors.
    pub struct KeywordEmbedder {
        pub keywords: Vec<&'static str>,
        pub calls: AtomicUsize,
        pub fail_on_call: Option<usize>,
    }

    impl KeywordEmbedder {
        pub fn new(keywords: Vec<&'static str>) -> Self {
            Self {
                keywords,
                calls: AtomicUsize::new(0),
                fail_on_call: None,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword-test"
        }

        async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_call == Some(n) {
                return Err(PipelineError::Embedding {
                    status: 500,
                    body: "model not loaded".to_string(),
                });
            }
            let lower = text.to_lowercase();
            Ok(self
                .keywords
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }
    }
}
