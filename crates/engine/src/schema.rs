//! Schema resolution: turning a model's `info` document into typed fields.
//!
//! The document is untrusted third-party data. Every field is inferred on its
//! own, so one field with an unknown `type` costs that field only; it is
//! skipped and reported as a warning diagnostic on the resolved schema.

use runway_types::{Diagnostic, FieldDescriptor, SemanticType, SlotValue, parse_bool};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Largest `length` a vector field may declare.
pub const MAX_VECTOR_LENGTH: usize = 1 << 16;

/// Everything learned from one successful `info` fetch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedSchema {
    summary: Option<String>,
    inputs: Vec<FieldDescriptor>,
    outputs: Vec<FieldDescriptor>,
    warnings: Vec<Diagnostic>,
}

impl ResolvedSchema {
    /// Free-text description of the model, when the document carries one.
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Declared inputs followed by the synthetic `Query` trigger.
    pub fn inputs(&self) -> &[FieldDescriptor] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[FieldDescriptor] {
        &self.outputs
    }

    /// Per-field problems found while inferring types.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

/// Errors raised while interpreting a metadata document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("field '{field}' does not match its declared shape: {reason}")]
    SchemaMismatch { field: String, reason: String },

    #[error("field '{field}' has unsupported type '{declared}'")]
    UnsupportedFieldType { field: String, declared: String },

    #[error("model metadata is not a JSON object: {0}")]
    MalformedDocument(String),

    #[error("model metadata section '{0}' is not a list")]
    InvalidSection(&'static str),
}

/// Interpret a whole `info` document.
///
/// Absent `inputs`/`outputs` sections count as empty. The `Query` trigger is
/// always appended as the last input.
pub fn resolve_schema(document: &Value) -> Result<ResolvedSchema, SchemaError> {
    let Value::Object(root) = document else {
        return Err(SchemaError::MalformedDocument(json_kind(document).to_string()));
    };

    let summary = match root.get("description") {
        None | Some(Value::Null) => None,
        Some(description) => Some(stringify(description)),
    };

    let mut warnings = Vec::new();
    let mut inputs = infer_section(section(document, "inputs")?, "input", &mut warnings);
    inputs.push(FieldDescriptor::query_trigger());
    let outputs = infer_section(section(document, "outputs")?, "output", &mut warnings);

    Ok(ResolvedSchema {
        summary,
        inputs,
        outputs,
        warnings,
    })
}

fn section<'a>(document: &'a Value, key: &'static str) -> Result<&'a [Value], SchemaError> {
    match document.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(SchemaError::InvalidSection(key)),
    }
}

fn infer_section(raw_fields: &[Value], role: &str, warnings: &mut Vec<Diagnostic>) -> Vec<FieldDescriptor> {
    let mut fields = Vec::with_capacity(raw_fields.len());
    for raw in raw_fields {
        match infer_field(raw) {
            Ok(field) => fields.push(field),
            Err(error) => {
                warn!(role, error = %error, "skipping model field");
                warnings.push(Diagnostic::warning(format!("Skipped {role}: {error}")));
            }
        }
    }
    fields
}

/// Infer the semantic type, default and description of one raw field.
///
/// | declared `type`              | semantic type                        |
/// |------------------------------|--------------------------------------|
/// | `text`, `dropdown`, `category` | [`SemanticType::Text`]             |
/// | `number`, `slider`           | `Integer` when `step` (or, without a step, the default) is an integer, else `Real` |
/// | `boolean`                    | `Boolean`                            |
/// | `vector`                     | `Vector` of `length` zeros           |
/// | `array`                      | by `itemType.type`: `text`, `number`, `image_bounding_box`, `image_landmarks` |
/// | `image`, `segmentation`      | `ImageRef`, no default image         |
///
/// Numeric defaults that fail to parse fall back to zero. Anything else is
/// [`SchemaError::UnsupportedFieldType`].
pub fn infer_field(raw: &Value) -> Result<FieldDescriptor, SchemaError> {
    let Value::Object(spec) = raw else {
        return Err(SchemaError::SchemaMismatch {
            field: "<unnamed>".into(),
            reason: format!("expected an object, found {}", json_kind(raw)),
        });
    };

    let name = spec.get("name").map(stringify).unwrap_or_default();
    if name.trim().is_empty() {
        return Err(SchemaError::SchemaMismatch {
            field: "<unnamed>".into(),
            reason: "field has no name".into(),
        });
    }
    let declared = spec.get("type").map(stringify).unwrap_or_default();
    let description = spec.get("description").map(stringify).unwrap_or_default();
    let default = spec.get("default").map(stringify).unwrap_or_default();

    let unsupported = |declared: String| SchemaError::UnsupportedFieldType {
        field: name.clone(),
        declared,
    };

    let (semantic_type, default_value, description) = match declared.trim() {
        "text" | "dropdown" | "category" => (SemanticType::Text, SlotValue::Text(default), description),
        "number" | "slider" => {
            let integral = match spec.get("step") {
                Some(step) if !step.is_null() => stringify(step).trim().parse::<i64>().is_ok(),
                _ => default.trim().parse::<i64>().is_ok(),
            };
            let value = if integral {
                SlotValue::Integer(default.trim().parse().unwrap_or(0))
            } else {
                SlotValue::Real(default.trim().parse().unwrap_or(0.0))
            };
            let range = format!(
                "Min: {} Max: {}",
                spec.get("min").map(stringify).unwrap_or_default(),
                spec.get("max").map(stringify).unwrap_or_default()
            );
            let description = if description.is_empty() { range } else { format!("{description}\n{range}") };
            (value.semantic_type(), value, description)
        }
        "boolean" => (
            SemanticType::Boolean,
            SlotValue::Boolean(parse_bool(&default).unwrap_or(false)),
            description,
        ),
        "vector" => {
            let length = vector_length(spec.get("length")).map_err(|reason| SchemaError::SchemaMismatch {
                field: name.clone(),
                reason,
            })?;
            (SemanticType::Vector, SlotValue::Vector(vec![0.0; length]), description)
        }
        "array" => {
            let item_type = spec
                .get("itemType")
                .and_then(|item| item.get("type"))
                .map(stringify)
                .unwrap_or_default();
            let semantic_type = match item_type.trim() {
                "text" => SemanticType::ArrayOfText,
                "number" => SemanticType::ArrayOfReal,
                "image_bounding_box" => SemanticType::ArrayOfRect,
                "image_landmarks" => SemanticType::ArrayOfPointList,
                other => return Err(unsupported(format!("array<{other}>"))),
            };
            (semantic_type, semantic_type.default_value(), description)
        }
        "image" | "segmentation" => (SemanticType::ImageRef, SlotValue::Image(None), description),
        other => return Err(unsupported(other.to_string())),
    };

    Ok(FieldDescriptor::new(name, semantic_type, default_value, description))
}

fn vector_length(raw: Option<&Value>) -> Result<usize, String> {
    let length = declared_vector_length(raw)?;
    if length > MAX_VECTOR_LENGTH {
        return Err(format!("vector length {length} exceeds the limit of {MAX_VECTOR_LENGTH}"));
    }
    Ok(length)
}

fn declared_vector_length(raw: Option<&Value>) -> Result<usize, String> {
    match raw {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|length| usize::try_from(length).ok())
            .ok_or_else(|| format!("vector length {number} is not a non-negative integer")),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map_err(|_| format!("vector length '{text}' is not a non-negative integer")),
        Some(other) => Err(format!("vector length must be a number, found {}", json_kind(other))),
        None => Err("vector field has no length".into()),
    }
}

/// Render a schema value as text: strings verbatim, `null` as empty, anything
/// else as compact JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
