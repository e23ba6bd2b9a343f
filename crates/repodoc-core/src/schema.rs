//! The DocPack JSON Schema and a validator for the subset of draft 2020-12
//! it uses.
//!
//! The schema text is embedded verbatim in generation prompts, so it is kept
//! as a JSON value rather than derived from the Rust types. Validation
//! collects every violation (not just the first) in an Ajv-compatible shape
//! that is fed back to the model during repair.
//!
//! Supported keywords: `type`, `required`, `properties`,
//! `additionalProperties: false`, `items`, and `format: "date-time"`.

use serde::Serialize;
use serde_json::{json, Map, Value};

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    /// JSON pointer to the offending value (`""` for the root).
    pub instance_path: String,
    /// JSON pointer into the schema, prefixed with `#`.
    pub schema_path: String,
    pub keyword: String,
    pub params: Value,
    pub message: String,
}

/// Build the DocPack schema.
pub fn doc_pack_schema() -> Value {
    let string = json!({ "type": "string" });
    let strings = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://example.com/doc_pack.schema.json",
        "type": "object",
        "required": [
            "meta", "summary", "features", "how_to_run", "tech_stack",
            "architecture", "security_notes", "limitations"
        ],
        "additionalProperties": false,
        "properties": {
            "meta": {
                "type": "object",
                "required": ["owner", "repo", "ref", "generated_at_iso"],
                "additionalProperties": false,
                "properties": {
                    "owner": string,
                    "repo": string,
                    "ref": string,
                    "commit_sha": string,
                    "generated_at_iso": { "type": "string", "format": "date-time" }
                }
            },
            "summary": {
                "type": "object",
                "required": ["name", "one_liner", "description"],
                "additionalProperties": false,
                "properties": {
                    "name": string,
                    "one_liner": string,
                    "description": string
                }
            },
            "features": strings,
            "how_to_run": {
                "type": "object",
                "required": ["prerequisites", "install_steps", "run_steps"],
                "additionalProperties": false,
                "properties": {
                    "prerequisites": strings,
                    "install_steps": strings,
                    "run_steps": strings
                }
            },
            "tech_stack": {
                "type": "object",
                "required": ["languages", "frameworks", "libraries"],
                "additionalProperties": false,
                "properties": {
                    "languages": strings,
                    "frameworks": strings,
                    "libraries": strings
                }
            },
            "architecture": {
                "type": "object",
                "required": ["overview", "key_components"],
                "additionalProperties": false,
                "properties": {
                    "overview": string,
                    "key_components": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name", "description"],
                            "additionalProperties": false,
                            "properties": {
                                "name": string,
                                "description": string
                            }
                        }
                    }
                }
            },
            "security_notes": strings,
            "limitations": strings,
            "citations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["section", "sources"],
                    "additionalProperties": false,
                    "properties": {
                        "section": string,
                        "sources": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["path", "start_line", "end_line"],
                                "additionalProperties": false,
                                "properties": {
                                    "path": string,
                                    "start_line": { "type": "integer" },
                                    "end_line": { "type": "integer" }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Validates JSON values against a schema fixed at construction.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Value,
}

impl SchemaValidator {
    pub fn new(schema: Value) -> Self {
        Self { schema }
    }

    /// Validator for [`doc_pack_schema`].
    pub fn doc_pack() -> Self {
        Self::new(doc_pack_schema())
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Check `value`, collecting all violations.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        walk(&self.schema, value, "", "#", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn walk(schema: &Value, value: &Value, instance_path: &str, schema_path: &str, errors: &mut Vec<ValidationError>) {
    if let Some(expected) = schema.get("type").and_then(|t| t.as_str()) {
        if !type_matches(expected, value) {
            errors.push(ValidationError {
                instance_path: instance_path.to_string(),
                schema_path: format!("{}/type", schema_path),
                keyword: "type".to_string(),
                params: json!({ "type": expected }),
                message: format!("must be {}", expected),
            });
            return;
        }
    }

    if let (Some(format), Some(s)) = (schema.get("format").and_then(|f| f.as_str()), value.as_str()) {
        if format == "date-time" && chrono::DateTime::parse_from_rfc3339(s).is_err() {
            errors.push(ValidationError {
                instance_path: instance_path.to_string(),
                schema_path: format!("{}/format", schema_path),
                keyword: "format".to_string(),
                params: json!({ "format": format }),
                message: format!("must match format \"{}\"", format),
            });
        }
    }

    match value {
        Value::Object(obj) => walk_object(schema, obj, instance_path, schema_path, errors),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    walk(
                        item_schema,
                        item,
                        &format!("{}/{}", instance_path, i),
                        &format!("{}/items", schema_path),
                        errors,
                    );
                }
            }
        }
        _ => {}
    }
}

fn walk_object(
    schema: &Value,
    obj: &Map<String, Value>,
    instance_path: &str,
    schema_path: &str,
    errors: &mut Vec<ValidationError>,
) {
    let properties = schema.get("properties").and_then(|p| p.as_object());

    if let Some(required) = schema.get("required").and_then(|r| r.as_array()) {
        for name in required.iter().filter_map(|r| r.as_str()) {
            if !obj.contains_key(name) {
                errors.push(ValidationError {
                    instance_path: instance_path.to_string(),
                    schema_path: format!("{}/required", schema_path),
                    keyword: "required".to_string(),
                    params: json!({ "missingProperty": name }),
                    message: format!("must have required property '{}'", name),
                });
            }
        }
    }

    if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
        for key in obj.keys() {
            if !properties.is_some_and(|p| p.contains_key(key)) {
                errors.push(ValidationError {
                    instance_path: instance_path.to_string(),
                    schema_path: format!("{}/additionalProperties", schema_path),
                    keyword: "additionalProperties".to_string(),
                    params: json!({ "additionalProperty": key }),
                    message: "must NOT have additional properties".to_string(),
                });
            }
        }
    }

    if let Some(properties) = properties {
        for (name, prop_schema) in properties {
            if let Some(child) = obj.get(name) {
                walk(
                    prop_schema,
                    child,
                    &format!("{}/{}", instance_path, escape_pointer(name)),
                    &format!("{}/properties/{}", schema_path, escape_pointer(name)),
                    errors,
                );
            }
        }
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
