//! Mutable, typed value holders on a live invocation.

use runway_types::{FieldDescriptor, SemanticType, SlotValue};

/// One input or output pin of an [`InvocationEngine`](crate::InvocationEngine).
///
/// The semantic type is fixed when the slot is created from its field; only
/// values of that same type can ever be stored. Vector slots also keep the
/// length of their default.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    name: String,
    original_name: String,
    semantic_type: SemanticType,
    vector_length: Option<usize>,
    value: SlotValue,
}

/// Why a slot refused a value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Rejection {
    WrongType(SemanticType),
    WrongLength { expected: usize, found: usize },
}

impl Slot {
    /// A slot holding the field's default value.
    pub fn from_field(field: &FieldDescriptor) -> Self {
        Self {
            name: field.display_name().to_string(),
            original_name: field.original_name().to_string(),
            semantic_type: field.semantic_type(),
            vector_length: match field.default_value() {
                SlotValue::Vector(values) => Some(values.len()),
                _ => None,
            },
            value: field.default_value().clone(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload key.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn value(&self) -> &SlotValue {
        &self.value
    }

    /// Whether `name` refers to this slot by wire name or display name.
    pub fn matches(&self, name: &str) -> bool {
        self.original_name == name || self.name == name
    }

    /// Declared element count of a vector slot.
    pub fn vector_length(&self) -> Option<usize> {
        self.vector_length
    }

    pub(crate) fn check(&self, value: &SlotValue) -> Result<(), Rejection> {
        if value.semantic_type() != self.semantic_type {
            return Err(Rejection::WrongType(value.semantic_type()));
        }
        if let (Some(expected), SlotValue::Vector(values)) = (self.vector_length, value)
            && values.len() != expected
        {
            return Err(Rejection::WrongLength {
                expected,
                found: values.len(),
            });
        }
        Ok(())
    }

    pub(crate) fn replace(&mut self, value: SlotValue) -> Result<(), Rejection> {
        self.check(&value)?;
        self.value = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_reject_values_of_another_type() {
        let field = FieldDescriptor::new("max_length", SemanticType::Integer, SlotValue::Integer(16), "");
        let mut slot = Slot::from_field(&field);
        assert_eq!(slot.name(), "Max Length");
        assert!(slot.matches("max_length"));
        assert!(slot.matches("Max Length"));

        let rejected = slot.replace(SlotValue::Real(1.5)).expect_err("type is fixed");
        assert_eq!(rejected, Rejection::WrongType(SemanticType::Real));
        assert_eq!(slot.value(), &SlotValue::Integer(16));

        slot.replace(SlotValue::Integer(32)).expect("same type");
        assert_eq!(slot.value(), &SlotValue::Integer(32));
    }

    #[test]
    fn vector_slots_keep_their_declared_length() {
        let field = FieldDescriptor::new("z", SemanticType::Vector, SlotValue::Vector(vec![0.0; 4]), "");
        let mut slot = Slot::from_field(&field);
        assert_eq!(slot.vector_length(), Some(4));

        let rejected = slot.replace(SlotValue::Vector(vec![1.0])).expect_err("length is fixed");
        assert_eq!(rejected, Rejection::WrongLength { expected: 4, found: 1 });
        assert_eq!(slot.value(), &SlotValue::Vector(vec![0.0; 4]));

        slot.replace(SlotValue::Vector(vec![0.5, 1.0, 1.5, 2.0])).expect("same length");
    }
}
