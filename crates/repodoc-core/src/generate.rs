//! Schema-constrained document generation with a bounded repair loop.
//!
//! The [`StructuredGenerator`] drives a generative model through a small
//! state machine:
//!
//! ```text
//! Draft ──valid──▶ Validated
//!   │
//!   └─invalid─▶ Repair ──valid──▶ Validated
//!                 │
//!                 └─invalid (budget spent)─▶ Failed (SchemaValidation)
//! ```
//!
//! Every transition issues exactly one call to the model. Each response is
//! parsed, unwrapped from a stray `doc_pack` wrapper, sanitized, and then
//! validated against the DocPack schema. The default budget is one repair
//! attempt, i.e. at most two generation calls per document.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::models::{DocMeta, DocPack, Retrieved};
use crate::sanitize::{sanitize, unwrap_doc_pack};
use crate::schema::{SchemaValidator, ValidationError};

/// Instructions sent ahead of every generation prompt.
pub const SYSTEM_PROMPT: &str = "\
You are a documentation generator. You must return ONLY a JSON object that VALIDATES against the provided JSON Schema.
Ground every statement ONLY in the provided snippets. If a detail is not present, use \"Unknown\" (strings) or [] (arrays).
DO NOT invent stack items, commands, or component names.
DO NOT change the structure, keys, or types of the provided SKELETON.
Arrays like architecture.key_components[] and citations[] MUST contain OBJECTS with the exact fields shown in the schema.";

/// A generative model running in JSON-constrained mode.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model identifier (e.g. `"qwen3:8b"`).
    fn model_name(&self) -> &str;

    /// Send one prompt and return the raw `response` field of the reply,
    /// which is either a JSON-encoded string or an already-decoded object.
    async fn generate(&self, prompt: &str) -> Result<Value>;
}

/// Turn a raw model response into a JSON value.
pub fn parse_generation_response(raw: Value) -> Result<Value> {
    match raw {
        Value::String(s) => serde_json::from_str(&s).map_err(|_| {
            PipelineError::GenerationParse("LLM did not return valid JSON string".to_string())
        }),
        obj @ Value::Object(_) => Ok(obj),
        _ => Err(PipelineError::GenerationParse(
            "LLM returned an unsupported response type".to_string(),
        )),
    }
}

/// Generation tuning, fixed at construction time.
#[derive(Debug, Clone)]
pub struct GeneratorParams {
    /// Extra generation calls allowed after an invalid draft.
    pub max_repair_attempts: usize,
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            max_repair_attempts: 1,
        }
    }
}

pub struct StructuredGenerator {
    params: GeneratorParams,
    validator: SchemaValidator,
}

impl StructuredGenerator {
    pub fn new(params: GeneratorParams, validator: SchemaValidator) -> Self {
        Self { params, validator }
    }

    /// Generate a validated [`DocPack`] for `meta` from the retrieved evidence.
    ///
    /// # Errors
    ///
    /// - Call and transport failures from `llm` propagate unchanged.
    /// - [`PipelineError::GenerationParse`] if a response is not JSON.
    /// - [`PipelineError::SchemaValidation`] once the repair budget is spent.
    pub async fn generate(
        &self,
        llm: &dyn TextGenerator,
        meta: DocMeta,
        retrieved: &[Retrieved],
    ) -> Result<DocPack> {
        let skeleton = serde_json::to_value(DocPack::skeleton(meta.clone()))
            .map_err(|e| PipelineError::DocPackCodec(e.to_string()))?;
        let user = self.user_prompt(&meta, &skeleton, retrieved);

        let mut prompt = compose_prompt(SYSTEM_PROMPT, &user);
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            tracing::info!(attempt = attempts, model = llm.model_name(), "requesting generation");

            let raw = llm.generate(&prompt).await?;
            let mut candidate = unwrap_doc_pack(parse_generation_response(raw)?);
            for note in sanitize(&mut candidate) {
                tracing::debug!(path = %note.path, action = %note.action, "sanitized candidate");
            }

            let errors = match self.validator.validate(&candidate) {
                Ok(()) => {
                    tracing::info!(attempt = attempts, "generated document validated");
                    return serde_json::from_value(candidate)
                        .map_err(|e| PipelineError::DocPackCodec(e.to_string()));
                }
                Err(errors) => errors,
            };

            tracing::warn!(
                attempt = attempts,
                errors = errors.len(),
                "generated document failed schema validation"
            );
            if attempts > self.params.max_repair_attempts {
                return Err(PipelineError::SchemaValidation { attempts, errors });
            }

            let repair = repair_addendum(&errors, &candidate, &skeleton);
            prompt = compose_prompt(SYSTEM_PROMPT, &format!("{}\n\n{}", user, repair));
        }
    }

    fn user_prompt(&self, meta: &DocMeta, skeleton: &Value, retrieved: &[Retrieved]) -> String {
        format!(
            "JSON_SCHEMA:\n{schema}\n\n\
             REPO_META:\n{meta}\n\n\
             SKELETON (valid DocPack object):\n{skeleton}\n\n\
             SNIPPETS (read-only evidence):\n{snippets}\n\n\
             TASK:\n\
             Return ONLY the SKELETON object with VALUES edited based on the SNIPPETS.\n\
             - Keep ALL keys, structure, and types EXACTLY as in SKELETON (do not wrap in \"doc_pack\", do not nest fields elsewhere).\n\
             - Arrays:\n  \
             - \"architecture.key_components\" MUST be an array of objects: {{ \"name\": string, \"description\": string }}.\n  \
             - \"citations\" MUST be an array of objects: {{ \"section\": string, \"sources\": {{ \"path\": string, \"start_line\": number, \"end_line\": number }}[] }}.\n\
             - Fill strings/arrays using only information in SNIPPETS; use \"Unknown\" or [] when not present.",
            schema = pretty(self.validator.schema()),
            meta = serde_json::to_string_pretty(meta).unwrap_or_default(),
            skeleton = pretty(skeleton),
            snippets = snippets_block(retrieved),
        )
    }
}

/// Render retrieved evidence grouped by section and labelled `path:start-end`.
pub fn snippets_block(retrieved: &[Retrieved]) -> String {
    retrieved
        .iter()
        .map(|r| {
            let body = r
                .snippets
                .iter()
                .map(|s| format!("### {}:{}-{}\n{}", s.file_path, s.start_line, s.end_line, s.text))
                .collect::<Vec<_>>()
                .join("\n\n");
            format!("## Section: {}\n{}", r.section_key, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn compose_prompt(system: &str, user: &str) -> String {
    format!("System:\n{}\n\nUser:\n{}\n", system, user)
}

fn repair_addendum(errors: &[ValidationError], previous: &Value, skeleton: &Value) -> String {
    format!(
        "Your previous JSON did not validate. Validation errors:\n{errors}\n\n\
         Here is your previous output:\n{previous}\n\n\
         You MUST return ONLY the SKELETON with values edited. Do NOT change keys, structure, or types.\n\
         - \"architecture.key_components\" must be array of objects {{ \"name\": string, \"description\": string }}.\n\
         - \"citations\" must be array of objects {{ \"section\": string, \"sources\": {{ \"path\": string, \"start_line\": number, \"end_line\": number }}[] }}.\n\n\
         SKELETON (valid DocPack object to edit):\n{skeleton}",
        errors = serde_json::to_string_pretty(errors).unwrap_or_default(),
        previous = pretty(previous),
        skeleton = pretty(skeleton),
    )
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::ScriptedGenerator;
    use super::*;
    use crate::models::Snippet;

    fn meta() -> DocMeta {
        DocMeta {
            owner: "octo".into(),
            repo: "demo".into(),
            git_ref: "main".into(),
            commit_sha: None,
            generated_at_iso: "2024-05-01T12:30:00.000Z".into(),
        }
    }

    fn valid_doc() -> Value {
        let mut v = serde_json::to_value(DocPack::skeleton(meta())).unwrap();
        v["summary"]["name"] = json!("demo");
        v["features"] = json!(["Fast builds"]);
        v
    }

    fn retrieved() -> Vec<Retrieved> {
        vec![Retrieved {
            section_key: "features".into(),
            snippets: vec![Snippet {
                file_path: "README.md".into(),
                start_line: 1,
                end_line: 12,
                text: "# demo\nFast builds".into(),
            }],
        }]
    }

    fn generator() -> StructuredGenerator {
        StructuredGenerator::new(GeneratorParams::default(), SchemaValidator::doc_pack())
    }

    #[tokio::test]
    async fn test_valid_draft_needs_one_call() {
        let llm = ScriptedGenerator::new(vec![Ok(json!(valid_doc().to_string()))]);
        let doc = generator().generate(&llm, meta(), &retrieved()).await.unwrap();
        assert_eq!(llm.calls(), 1);
        assert_eq!(doc.summary.name, "demo");
        assert_eq!(doc.features, vec!["Fast builds"]);
    }

    #[tokio::test]
    async fn test_sanitizable_draft_needs_one_call() {
        let mut draft = valid_doc();
        draft["architecture"]["key_components"] = json!(["Parser", "Renderer"]);
        let llm = ScriptedGenerator::new(vec![Ok(json!({ "doc_pack": draft }))]);
        let doc = generator().generate(&llm, meta(), &retrieved()).await.unwrap();
        assert_eq!(llm.calls(), 1);
        assert_eq!(doc.architecture.key_components.len(), 2);
        assert_eq!(doc.architecture.key_components[1].name, "Renderer");
        assert_eq!(doc.architecture.key_components[1].description, "Unknown");
    }

    #[tokio::test]
    async fn test_repair_then_valid() {
        let llm = ScriptedGenerator::new(vec![
            Ok(json!({ "summary": "nope" })),
            Ok(valid_doc()),
        ]);
        let doc = generator().generate(&llm, meta(), &retrieved()).await.unwrap();
        assert_eq!(llm.calls(), 2);
        assert_eq!(doc.meta, meta());

        let repair = llm.prompt(1);
        assert!(repair.starts_with("System:\n"));
        assert!(repair.contains("Your previous JSON did not validate"));
        assert!(repair.contains("must have required property 'meta'"));
        assert!(repair.contains("SNIPPETS (read-only evidence)"));
        let (_, previous) = repair.split_once("Here is your previous output:").unwrap();
        let (previous, skeleton) = previous.split_once("SKELETON (valid DocPack object to edit)").unwrap();
        // The echoed draft is the sanitized one.
        assert!(previous.contains("\"summary\": \"nope\""));
        assert!(previous.contains("\"features\": []"));
        assert!(skeleton.contains("\"one_liner\": \"Unknown\""));
    }

    #[tokio::test]
    async fn test_permissive_schema_surfaces_decode_failure() {
        let permissive = StructuredGenerator::new(
            GeneratorParams::default(),
            SchemaValidator::new(json!({ "type": "object" })),
        );
        let llm = ScriptedGenerator::new(vec![Ok(json!({ "summary": "nope" }))]);
        let err = permissive.generate(&llm, meta(), &retrieved()).await.unwrap_err();
        assert!(matches!(err, PipelineError::DocPackCodec(_)));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_fails_after_one_repair() {
        let llm = ScriptedGenerator::new(vec![
            Ok(json!({ "summary": "nope" })),
            Ok(json!({ "summary": "still nope" })),
            Ok(valid_doc()),
        ]);
        let err = generator().generate(&llm, meta(), &retrieved()).await.unwrap_err();
        assert_eq!(llm.calls(), 2);
        match err {
            PipelineError::SchemaValidation { attempts, errors } => {
                assert_eq!(attempts, 2);
                assert!(errors.iter().any(|e| e.keyword == "required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_repair_budget() {
        let gen = StructuredGenerator::new(
            GeneratorParams {
                max_repair_attempts: 0,
            },
            SchemaValidator::doc_pack(),
        );
        let llm = ScriptedGenerator::new(vec![Ok(json!({})), Ok(valid_doc())]);
        assert!(gen.generate(&llm, meta(), &retrieved()).await.is_err());
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_response() {
        let llm = ScriptedGenerator::new(vec![Ok(json!("{not json"))]);
        let err = generator().generate(&llm, meta(), &retrieved()).await.unwrap_err();
        assert!(matches!(err, PipelineError::GenerationParse(_)));
        assert_eq!(err.to_string(), "LLM did not return valid JSON string");

        let llm = ScriptedGenerator::new(vec![Ok(json!(42))]);
        let err = generator().generate(&llm, meta(), &retrieved()).await.unwrap_err();
        assert!(matches!(err, PipelineError::GenerationParse(_)));
    }

    #[tokio::test]
    async fn test_call_error_propagates() {
        let llm = ScriptedGenerator::new(vec![Err(PipelineError::GenerationCall {
            status: 503,
            body: "busy".into(),
        })]);
        let err = generator().generate(&llm, meta(), &retrieved()).await.unwrap_err();
        assert_eq!(err.to_string(), "LLM failed: 503 busy");
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_prompt_contains_schema_skeleton_and_evidence() {
        let llm = ScriptedGenerator::new(vec![Ok(valid_doc())]);
        generator().generate(&llm, meta(), &retrieved()).await.unwrap();
        let prompt = llm.prompt(0);
        assert!(prompt.contains("JSON_SCHEMA:"));
        assert!(prompt.contains("\"additionalProperties\": false"));
        assert!(prompt.contains("SKELETON (valid DocPack object):"));
        assert!(prompt.contains("## Section: features\n### README.md:1-12\n# demo\nFast builds"));
    }

    #[test]
    fn test_snippets_block_separates_sections() {
        let mut r = retrieved();
        r.push(Retrieved {
            section_key: "limitations".into(),
            snippets: vec![],
        });
        let block = snippets_block(&r);
        assert!(block.ends_with("\n\n---\n\n## Section: limitations\n"));
    }
}
