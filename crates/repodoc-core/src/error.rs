//! Error taxonomy for the documentation pipeline.
//!
//! Every variant propagates unmodified to the request boundary, which turns
//! it into a single user-visible message. Nothing here is retried except
//! through the generator's bounded repair loop.

use thiserror::Error;

use crate::schema::ValidationError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The embedding endpoint answered with a non-success status.
    #[error("Embedding failed: {status} {body}")]
    Embedding { status: u16, body: String },

    /// The embedding endpoint could not be reached or returned an unusable body.
    #[error("Embedding request failed: {0}")]
    EmbeddingTransport(String),

    /// The generation endpoint answered with a non-success status.
    #[error("LLM failed: {status} {body}")]
    GenerationCall { status: u16, body: String },

    /// The generation endpoint could not be reached.
    #[error("LLM request failed: {0}")]
    GenerationTransport(String),

    /// The model's response was neither a JSON string nor a JSON object.
    #[error("{0}")]
    GenerationParse(String),

    /// A DocPack could not be converted to or from its JSON form. Only reachable
    /// when the validator's schema is looser than the [`DocPack`](crate::DocPack) type.
    #[error("DocPack conversion failed: {0}")]
    DocPackCodec(String),

    /// The final candidate still violates the DocPack schema.
    #[error(
        "LLM returned invalid JSON after {attempts} attempt(s). Errors: {}",
        summarize(.errors)
    )]
    SchemaValidation {
        attempts: usize,
        errors: Vec<ValidationError>,
    },
}

fn summarize(errors: &[ValidationError]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| format!("{} error(s)", errors.len()))
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
