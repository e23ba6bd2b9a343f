//! Best-effort structural repair of generated DocPack candidates.
//!
//! Generative models drift from the requested shape in a few predictable
//! ways: bare strings where objects were asked for, non-string list items,
//! a `{"doc_pack": …}` wrapper around the answer. [`sanitize`] coerces those
//! shapes in place without inventing content. Malformed entries are dropped
//! or replaced with the [`UNKNOWN`] sentinel, never filled with made-up facts.
//!
//! Sanitizing never fails. Each coercion is reported as a [`CoercionNote`]
//! so callers can log what was changed.

use serde_json::{json, Map, Value};

use crate::models::UNKNOWN;

/// A single structural coercion applied to a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionNote {
    /// JSON pointer of the coerced value.
    pub path: String,
    pub action: String,
}

impl CoercionNote {
    fn new(path: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            action: action.into(),
        }
    }
}

/// Replace `{"doc_pack": X}` with `X` when `doc_pack` is the only key.
pub fn unwrap_doc_pack(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("doc_pack") => {
            obj.remove("doc_pack").unwrap_or(Value::Null)
        }
        other => other,
    }
}

const STRING_LISTS: &[&str] = &["features", "security_notes", "limitations"];
const HOW_TO_RUN_LISTS: &[&str] = &["prerequisites", "install_steps", "run_steps"];
const TECH_STACK_LISTS: &[&str] = &["languages", "frameworks", "libraries"];
const SUMMARY_FIELDS: &[&str] = &["name", "one_liner", "description"];
const META_FIELDS: &[&str] = &["owner", "repo", "ref", "generated_at_iso"];

/// Coerce common structural drift in place. Non-object candidates are left untouched.
pub fn sanitize(candidate: &mut Value) -> Vec<CoercionNote> {
    let mut notes = Vec::new();
    let Some(root) = candidate.as_object_mut() else {
        return notes;
    };

    if let Some(arch) = root.get_mut("architecture").and_then(Value::as_object_mut) {
        if let Some(kc) = arch.get_mut("key_components") {
            *kc = key_components(kc, "/architecture/key_components", &mut notes);
        }
        if let Some(overview) = arch.get_mut("overview") {
            ensure_string(overview, "/architecture/overview", &mut notes);
        }
    }

    if let Some(citations) = root.get_mut("citations") {
        *citations = citation_list(citations, &mut notes);
    }

    if let Some(htr) = root.get_mut("how_to_run").and_then(Value::as_object_mut) {
        for key in HOW_TO_RUN_LISTS {
            string_list_field(htr, key, "/how_to_run", &mut notes);
        }
    }

    if let Some(ts) = root.get_mut("tech_stack").and_then(Value::as_object_mut) {
        for key in TECH_STACK_LISTS {
            string_list_field(ts, key, "/tech_stack", &mut notes);
        }
    }

    for key in STRING_LISTS {
        string_list_field(root, key, "", &mut notes);
    }

    if let Some(summary) = root.get_mut("summary").and_then(Value::as_object_mut) {
        for key in SUMMARY_FIELDS {
            string_field(summary, key, "/summary", &mut notes);
        }
    }

    if let Some(meta) = root.get_mut("meta").and_then(Value::as_object_mut) {
        for key in META_FIELDS {
            string_field(meta, key, "/meta", &mut notes);
        }
        if meta.get("commit_sha").is_some_and(|v| !v.is_string()) {
            meta.remove("commit_sha");
            notes.push(CoercionNote::new("/meta/commit_sha", "dropped non-string value"));
        }
    }

    notes
}

fn ensure_string(value: &mut Value, path: &str, notes: &mut Vec<CoercionNote>) {
    if !value.is_string() {
        *value = Value::String(UNKNOWN.to_string());
        notes.push(CoercionNote::new(path, "replaced non-string with sentinel"));
    }
}

fn string_field(obj: &mut Map<String, Value>, key: &str, parent: &str, notes: &mut Vec<CoercionNote>) {
    let path = format!("{}/{}", parent, key);
    match obj.get_mut(key) {
        Some(v) => ensure_string(v, &path, notes),
        None => {
            obj.insert(key.to_string(), Value::String(UNKNOWN.to_string()));
            notes.push(CoercionNote::new(path, "filled missing string with sentinel"));
        }
    }
}

fn string_list_field(obj: &mut Map<String, Value>, key: &str, parent: &str, notes: &mut Vec<CoercionNote>) {
    let path = format!("{}/{}", parent, key);
    let coerced = match obj.get(key) {
        Some(Value::Array(items)) => {
            let kept: Vec<Value> = items
                .iter()
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .cloned()
                .collect();
            if kept.len() == items.len() {
                return;
            }
            notes.push(CoercionNote::new(
                &path,
                format!("dropped {} non-string or empty item(s)", items.len() - kept.len()),
            ));
            kept
        }
        _ => {
            notes.push(CoercionNote::new(&path, "replaced non-array with empty list"));
            Vec::new()
        }
    };
    obj.insert(key.to_string(), Value::Array(coerced));
}

fn string_or_unknown(v: Option<&Value>) -> Value {
    Value::String(v.and_then(Value::as_str).unwrap_or(UNKNOWN).to_string())
}

fn key_components(value: &Value, path: &str, notes: &mut Vec<CoercionNote>) -> Value {
    let Some(items) = value.as_array() else {
        notes.push(CoercionNote::new(path, "replaced non-array with empty list"));
        return json!([]);
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(name) => {
                notes.push(CoercionNote::new(format!("{}/{}", path, i), "wrapped bare string as component"));
                out.push(json!({ "name": name, "description": UNKNOWN }));
            }
            Value::Object(obj) => out.push(json!({
                "name": string_or_unknown(obj.get("name")),
                "description": string_or_unknown(obj.get("description")),
            })),
            _ => notes.push(CoercionNote::new(format!("{}/{}", path, i), "dropped malformed component")),
        }
    }
    Value::Array(out)
}

fn citation_list(value: &Value, notes: &mut Vec<CoercionNote>) -> Value {
    let Some(items) = value.as_array() else {
        notes.push(CoercionNote::new("/citations", "replaced non-array with empty list"));
        return json!([]);
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let path = format!("/citations/{}", i);
        match item {
            Value::String(section) => {
                notes.push(CoercionNote::new(&path, "wrapped bare string as citation"));
                out.push(json!({ "section": section, "sources": [] }));
            }
            Value::Object(obj) => {
                let sources = citation_sources(obj.get("sources"), &format!("{}/sources", path), notes);
                out.push(json!({
                    "section": string_or_unknown(obj.get("section")),
                    "sources": sources,
                }));
            }
            _ => notes.push(CoercionNote::new(path, "dropped malformed citation")),
        }
    }
    Value::Array(out)
}

fn citation_sources(value: Option<&Value>, path: &str, notes: &mut Vec<CoercionNote>) -> Value {
    let Some(items) = value.and_then(Value::as_array) else {
        return json!([]);
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(p) => {
                notes.push(CoercionNote::new(format!("{}/{}", path, i), "wrapped bare string as source"));
                out.push(json!({ "path": p, "start_line": 1, "end_line": 1 }));
            }
            Value::Object(obj) => {
                let start = line_number(obj.get("start_line")).unwrap_or_else(|| json!(1));
                let end = line_number(obj.get("end_line"))
                    .unwrap_or_else(|| json!(start.as_i64().unwrap_or(1).max(1)));
                out.push(json!({
                    "path": string_or_unknown(obj.get("path")),
                    "start_line": start,
                    "end_line": end,
                }));
            }
            _ => notes.push(CoercionNote::new(format!("{}/{}", path, i), "dropped malformed source")),
        }
    }
    Value::Array(out)
}

/// Keep numeric line values as-is (integers normalized); anything else is absent.
fn line_number(v: Option<&Value>) -> Option<Value> {
    let n = v?.as_number()?;
    if let Some(i) = n.as_i64() {
        return Some(json!(i));
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => Some(json!(f as i64)),
        Some(f) if f.is_finite() => Some(json!(f)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocMeta, DocPack};
    use crate::schema::SchemaValidator;

    fn skeleton() -> Value {
        serde_json::to_value(DocPack::skeleton(DocMeta {
            owner: "octo".into(),
            repo: "demo".into(),
            git_ref: "HEAD".into(),
            commit_sha: None,
            generated_at_iso: "2024-05-01T12:30:00.000Z".into(),
        }))
        .unwrap()
    }

    #[test]
    fn test_unwrap_only_single_key_wrapper() {
        let inner = json!({ "meta": {} });
        assert_eq!(unwrap_doc_pack(json!({ "doc_pack": inner.clone() })), inner);

        let two_keys = json!({ "doc_pack": {}, "other": 1 });
        assert_eq!(unwrap_doc_pack(two_keys.clone()), two_keys);
    }

    #[test]
    fn test_bare_string_components_become_valid() {
        let mut v = skeleton();
        v["architecture"]["key_components"] = json!(["Parser", { "name": "Lexer" }, 7]);
        let notes = sanitize(&mut v);

        assert_eq!(
            v["architecture"]["key_components"],
            json!([
                { "name": "Parser", "description": "Unknown" },
                { "name": "Lexer", "description": "Unknown" }
            ])
        );
        assert_eq!(notes.len(), 2);
        assert!(SchemaValidator::doc_pack().validate(&v).is_ok());
    }

    #[test]
    fn test_citations_coerced() {
        let mut v = skeleton();
        v["citations"] = json!([
            "features",
            { "section": "how_to_run", "sources": ["README.md", { "path": "Makefile", "start_line": 4 }] },
            null
        ]);
        sanitize(&mut v);
        assert_eq!(
            v["citations"],
            json!([
                { "section": "features", "sources": [] },
                { "section": "how_to_run", "sources": [
                    { "path": "README.md", "start_line": 1, "end_line": 1 },
                    { "path": "Makefile", "start_line": 4, "end_line": 4 }
                ]}
            ])
        );
        assert!(SchemaValidator::doc_pack().validate(&v).is_ok());
    }

    #[test]
    fn test_string_lists_drop_non_strings() {
        let mut v = skeleton();
        v["features"] = json!(["fast", 3, "", null, "safe"]);
        v["tech_stack"]["languages"] = json!("Rust");
        v["how_to_run"]["run_steps"] = json!([["cargo run"], "cargo run"]);
        sanitize(&mut v);
        assert_eq!(v["features"], json!(["fast", "safe"]));
        assert_eq!(v["tech_stack"]["languages"], json!([]));
        assert_eq!(v["how_to_run"]["run_steps"], json!(["cargo run"]));
    }

    #[test]
    fn test_missing_top_level_lists_filled() {
        let mut v = skeleton();
        v.as_object_mut().unwrap().remove("limitations");
        sanitize(&mut v);
        assert_eq!(v["limitations"], json!([]));
    }

    #[test]
    fn test_string_leaves_and_commit_sha() {
        let mut v = skeleton();
        v["summary"]["one_liner"] = json!(["not", "a", "string"]);
        v["architecture"]["overview"] = json!(null);
        v["meta"]["commit_sha"] = json!(1234);
        sanitize(&mut v);
        assert_eq!(v["summary"]["one_liner"], "Unknown");
        assert_eq!(v["architecture"]["overview"], "Unknown");
        assert!(v["meta"].get("commit_sha").is_none());
    }

    #[test]
    fn test_valid_candidate_untouched() {
        let mut v = skeleton();
        let before = v.clone();
        assert!(sanitize(&mut v).is_empty());
        assert_eq!(v, before);
    }

    #[test]
    fn test_non_object_untouched() {
        let mut v = json!(["nope"]);
        assert!(sanitize(&mut v).is_empty());
        assert_eq!(v, json!(["nope"]));
    }
}
