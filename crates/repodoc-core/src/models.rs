//! Core data models that flow through the documentation pipeline.
//!
//! [`FileEntry`] values come from repository acquisition, are cut into
//! [`Chunk`]s, embedded into [`EmbeddedChunk`]s, narrowed to per-section
//! [`Retrieved`] evidence, and finally turned into a [`DocPack`].

use serde::{Deserialize, Serialize};

/// Sentinel used for any string leaf the evidence does not support.
pub const UNKNOWN: &str = "Unknown";

/// One extracted text file from the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Decoded file contents.
    pub content: String,
    /// Contents split on `\r?\n`.
    pub lines: Vec<String>,
    /// Size of the raw file in bytes.
    pub size: usize,
}

impl FileEntry {
    /// Build an entry from decoded text, splitting lines on `\n` and `\r\n`.
    pub fn from_text(path: impl Into<String>, content: impl Into<String>, size: usize) -> Self {
        let content = content.into();
        let lines = content
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        Self {
            path: path.into(),
            content,
            lines,
            size,
        }
    }
}

/// A contiguous character window of one file, with its 1-based inclusive line range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// `{path}:{start_line}-{end_line}:{ordinal}`.
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

/// A [`Chunk`] paired with its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// One piece of evidence selected for a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

impl From<&Chunk> for Snippet {
    fn from(c: &Chunk) -> Self {
        Self {
            file_path: c.file_path.clone(),
            start_line: c.start_line,
            end_line: c.end_line,
            text: c.text.clone(),
        }
    }
}

/// Ranked evidence for one section, at most one snippet per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Retrieved {
    pub section_key: String,
    pub snippets: Vec<Snippet>,
}

// ============ DocPack ============

/// Repository metadata stamped into every generated document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocMeta {
    pub owner: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    /// ISO-8601 / RFC 3339 timestamp.
    pub generated_at_iso: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    pub name: String,
    pub one_liner: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HowToRun {
    pub prerequisites: Vec<String>,
    pub install_steps: Vec<String>,
    pub run_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TechStack {
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub libraries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyComponent {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Architecture {
    pub overview: String,
    pub key_components: Vec<KeyComponent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitationSource {
    pub path: String,
    pub start_line: i64,
    pub end_line: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Citation {
    pub section: String,
    pub sources: Vec<CitationSource>,
}

/// The structured documentation object produced for a repository.
///
/// Unknown information is represented by [`UNKNOWN`] or an empty list;
/// keys are never omitted (except the optional `citations` and
/// `meta.commit_sha`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocPack {
    pub meta: DocMeta,
    pub summary: Summary,
    pub features: Vec<String>,
    pub how_to_run: HowToRun,
    pub tech_stack: TechStack,
    pub architecture: Architecture,
    pub security_notes: Vec<String>,
    pub limitations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl DocPack {
    /// A fully-typed, sentinel-valued document carrying only `meta`.
    ///
    /// This is the editing template handed to the generative model.
    pub fn skeleton(meta: DocMeta) -> Self {
        Self {
            meta,
            summary: Summary {
                name: UNKNOWN.to_string(),
                one_liner: UNKNOWN.to_string(),
                description: UNKNOWN.to_string(),
            },
            features: Vec::new(),
            how_to_run: HowToRun {
                prerequisites: Vec::new(),
                install_steps: Vec::new(),
                run_steps: Vec::new(),
            },
            tech_stack: TechStack {
                languages: Vec::new(),
                frameworks: Vec::new(),
                libraries: Vec::new(),
            },
            architecture: Architecture {
                overview: UNKNOWN.to_string(),
                key_components: Vec::new(),
            },
            security_notes: Vec::new(),
            limitations: Vec::new(),
            citations: Some(Vec::new()),
        }
    }

    /// Sources cited for `section`, or an empty slice.
    pub fn sources_for(&self, section: &str) -> &[CitationSource] {
        self.citations
            .as_deref()
            .and_then(|cs| cs.iter().find(|c| c.section == section))
            .map(|c| c.sources.as_slice())
            .unwrap_or(&[])
    }
}
