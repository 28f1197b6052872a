//! Field metadata for model inputs and outputs.

use crate::{SemanticType, SlotValue};

/// Wire name of the synthetic trailing trigger input.
pub const QUERY_FIELD_NAME: &str = "Query";
/// Description attached to the synthetic trigger input.
pub const QUERY_FIELD_DESCRIPTION: &str = "Sends a query every frame as long as enabled";

/// Immutable description of one model input or output.
///
/// Built once during schema resolution. The display name is derived from the
/// wire name and never changes afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    original_name: String,
    display_name: String,
    semantic_type: SemanticType,
    default_value: SlotValue,
    description: String,
}

impl FieldDescriptor {
    /// Create a descriptor, deriving the display name from `original_name`.
    ///
    /// A `default_value` of a different semantic type is replaced by the
    /// type's own default so the two can never disagree.
    pub fn new(
        original_name: impl Into<String>,
        semantic_type: SemanticType,
        default_value: SlotValue,
        description: impl Into<String>,
    ) -> Self {
        let original_name = original_name.into();
        let default_value = if default_value.semantic_type() == semantic_type {
            default_value
        } else {
            semantic_type.default_value()
        };
        Self {
            display_name: display_name(&original_name),
            original_name,
            semantic_type,
            default_value,
            description: description.into(),
        }
    }

    /// The synthetic boolean input that triggers a query while enabled.
    pub fn query_trigger() -> Self {
        Self::new(
            QUERY_FIELD_NAME,
            SemanticType::Boolean,
            SlotValue::Boolean(false),
            QUERY_FIELD_DESCRIPTION,
        )
    }

    /// Key used for this field in request and response payloads.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn default_value(&self) -> &SlotValue {
        &self.default_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Derive a display name from a snake_case wire name.
///
/// Splits on `_`, upper-cases the first character of each part and joins the
/// parts with single spaces. Empty parts are dropped.
///
/// ```rust
/// use runway_types::display_name;
///
/// assert_eq!(display_name("bounding_box"), "Bounding Box");
/// assert_eq!(display_name("text"), "Text");
/// assert_eq!(display_name(""), "");
/// ```
pub fn display_name(raw: &str) -> String {
    raw.split('_')
        .filter(|part| !part.is_empty())
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_is_idempotent() {
        for raw in ["bounding_box", "text", "", "max_new_tokens", "already Nice"] {
            let once = display_name(raw);
            assert_eq!(display_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn display_name_tolerates_stray_underscores() {
        assert_eq!(display_name("_leading__double_"), "Leading Double");
    }

    #[test]
    fn display_name_keeps_inner_case() {
        assert_eq!(display_name("imageURL"), "ImageURL");
    }

    #[test]
    fn query_trigger_is_a_false_boolean() {
        let query = FieldDescriptor::query_trigger();
        assert_eq!(query.original_name(), "Query");
        assert_eq!(query.display_name(), "Query");
        assert_eq!(query.semantic_type(), SemanticType::Boolean);
        assert_eq!(query.default_value(), &SlotValue::Boolean(false));
        assert_eq!(query.description(), QUERY_FIELD_DESCRIPTION);
    }

    #[test]
    fn mismatched_default_falls_back_to_type_default() {
        let field = FieldDescriptor::new("steps", SemanticType::Integer, SlotValue::Text("x".into()), "");
        assert_eq!(field.default_value(), &SlotValue::Integer(0));
    }
}
