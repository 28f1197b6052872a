//! What the host sees of a model: a named, categorized node with typed pins.

use std::fmt;

use runway_types::{Diagnostic, FieldDescriptor, SemanticType, SlotValue};

/// One input or output pin offered to the host.
#[derive(Clone, Debug, PartialEq)]
pub struct PinDescription {
    pub display_name: String,
    pub wire_name: String,
    pub semantic_type: SemanticType,
    pub default_value: SlotValue,
    pub description: String,
}

impl From<&FieldDescriptor> for PinDescription {
    fn from(field: &FieldDescriptor) -> Self {
        Self {
            display_name: field.display_name().to_string(),
            wire_name: field.original_name().to_string(),
            semantic_type: field.semantic_type(),
            default_value: field.default_value().clone(),
            description: field.description().to_string(),
        }
    }
}

/// Node registration data for one model.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeDescription {
    pub name: String,
    pub category: &'static str,
    pub summary: Option<String>,
    pub inputs: Vec<PinDescription>,
    pub outputs: Vec<PinDescription>,
    pub messages: Vec<Diagnostic>,
    /// Page opened by the host's "edit" action; hosted models only.
    pub dashboard_url: Option<String>,
}

impl fmt::Display for PinDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {}, default {})", self.display_name, self.wire_name, self.semantic_type, self.default_value)
    }
}
