//! # repodoc core
//!
//! Shared, WASM-safe logic for repodoc: data models, chunking, similarity
//! scoring, section retrieval, the DocPack schema, and the
//! schema-validate-repair generation loop.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or other
//! native-only dependencies. Network-bound collaborators are reached through
//! the [`embedding::Embedder`] and [`generate::TextGenerator`] traits, which
//! the `repodoc` app crate implements against Ollama.
//!
//! ```text
//! FileEntry[] ─▶ chunk ─▶ embed ─▶ retrieve (per section) ─▶ generate ─▶ DocPack
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod models;
pub mod pipeline;
pub mod retrieve;
pub mod sanitize;
pub mod schema;
pub mod similarity;

pub use error::PipelineError;
pub use models::{Chunk, DocMeta, DocPack, EmbeddedChunk, FileEntry, Retrieved, Snippet};
