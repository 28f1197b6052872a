//! Per-node invocation: typed slots in, one `query` call, typed slots out.

use std::sync::Arc;

use runway_api::ApiError;
use runway_types::{QUERY_FIELD_NAME, SemanticType, SlotValue};
use thiserror::Error;
use tracing::debug;

use crate::codec::{CodecError, decode_outputs, encode_inputs};
use crate::descriptor::ModelDescriptor;
use crate::slot::{Rejection, Slot};

/// What a call to [`InvocationEngine::update`] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UpdateOutcome {
    /// No inputs, or the `Query` trigger is off. Nothing was sent.
    Idle,
    /// The model answered with no value; outputs were left alone.
    Skipped,
    /// Every output slot holds the model's latest answer.
    Updated,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("slot '{slot}' holds {expected} values, got {found}")]
    TypeMismatch {
        slot: String,
        expected: SemanticType,
        found: SemanticType,
    },

    #[error("vector slot '{slot}' holds {expected} values, got {found}")]
    LengthMismatch { slot: String, expected: usize, found: usize },

    #[error("no slot named '{0}'")]
    UnknownSlot(String),
}

/// The live state of one model node in a dataflow graph.
///
/// Slot order, count and types are fixed at construction from the
/// descriptor's schema. The last input is always the `Query` trigger.
#[derive(Debug)]
pub struct InvocationEngine {
    descriptor: Arc<ModelDescriptor>,
    inputs: Vec<Slot>,
    outputs: Vec<Slot>,
}

impl InvocationEngine {
    /// Resolve the descriptor if needed and seed slots with field defaults.
    ///
    /// An unresolved or inactive model yields an engine with no slots.
    pub fn new(descriptor: Arc<ModelDescriptor>) -> Self {
        descriptor.resolve();
        let (inputs, outputs) = match descriptor.schema() {
            Some(schema) => (
                schema.inputs().iter().map(Slot::from_field).collect(),
                schema.outputs().iter().map(Slot::from_field).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            descriptor,
            inputs,
            outputs,
        }
    }

    pub fn descriptor(&self) -> &Arc<ModelDescriptor> {
        &self.descriptor
    }

    pub fn inputs(&self) -> &[Slot] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Slot] {
        &self.outputs
    }

    /// Look up an input by wire name or display name.
    pub fn input(&self, name: &str) -> Option<&Slot> {
        self.inputs.iter().find(|slot| slot.matches(name))
    }

    pub fn output(&self, name: &str) -> Option<&Slot> {
        self.outputs.iter().find(|slot| slot.matches(name))
    }

    /// Assign an input by wire name or display name.
    pub fn set_input(&mut self, name: &str, value: SlotValue) -> Result<(), InvocationError> {
        let slot = self
            .inputs
            .iter_mut()
            .find(|slot| slot.matches(name))
            .ok_or_else(|| InvocationError::UnknownSlot(name.to_string()))?;
        assign(slot, value)
    }

    pub fn set_input_at(&mut self, index: usize, value: SlotValue) -> Result<(), InvocationError> {
        let slot = self
            .inputs
            .get_mut(index)
            .ok_or_else(|| InvocationError::UnknownSlot(format!("#{index}")))?;
        assign(slot, value)
    }

    /// Switch the trailing `Query` trigger.
    pub fn set_query(&mut self, enabled: bool) -> Result<(), InvocationError> {
        let slot = self
            .inputs
            .last_mut()
            .ok_or_else(|| InvocationError::UnknownSlot(QUERY_FIELD_NAME.to_string()))?;
        assign(slot, SlotValue::Boolean(enabled))
    }

    pub fn query_enabled(&self) -> bool {
        self.inputs.last().and_then(|slot| slot.value().as_bool()) == Some(true)
    }

    /// Run one evaluation tick.
    ///
    /// While `Query` is on, every tick sends a fresh request; there is no
    /// edge detection. Any failure leaves every output untouched.
    pub fn update(&mut self) -> Result<UpdateOutcome, InvocationError> {
        let Some((trigger, fields)) = self.inputs.split_last() else {
            return Ok(UpdateOutcome::Idle);
        };
        if trigger.value().as_bool() != Some(true) {
            return Ok(UpdateOutcome::Idle);
        }

        let payload = encode_inputs(fields)?;
        debug!(model = %self.descriptor.full_identifier(), fields = fields.len(), "querying model");
        let response = self.descriptor.transport().query(&payload)?;

        let Some(values) = decode_outputs(&self.outputs, &response)? else {
            debug!(model = %self.descriptor.full_identifier(), "model returned no value");
            return Ok(UpdateOutcome::Skipped);
        };
        for (slot, value) in self.outputs.iter().zip(&values) {
            slot.check(value).map_err(|rejection| rejected(slot, rejection))?;
        }
        for (slot, value) in self.outputs.iter_mut().zip(values) {
            assign(slot, value)?;
        }
        Ok(UpdateOutcome::Updated)
    }
}

fn assign(slot: &mut Slot, value: SlotValue) -> Result<(), InvocationError> {
    slot.replace(value).map_err(|rejection| rejected(&*slot, rejection))
}

fn rejected(slot: &Slot, rejection: Rejection) -> InvocationError {
    let name = slot.original_name().to_string();
    match rejection {
        Rejection::WrongType(found) => InvocationError::TypeMismatch {
            slot: name,
            expected: slot.semantic_type(),
            found,
        },
        Rejection::WrongLength { expected, found } => InvocationError::LengthMismatch {
            slot: name,
            expected,
            found,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::{FakeTransport, not_found};
    use runway_registry::ModelEntry;
    use runway_types::Rect;
    use serde_json::json;

    fn engine_for(info: serde_json::Value) -> (InvocationEngine, Arc<FakeTransport>) {
        let transport = FakeTransport::new(vec![Ok(info)]);
        let entry = ModelEntry::local("detector", "http://localhost:8000");
        let descriptor = Arc::new(ModelDescriptor::with_transport(&entry, transport.clone()));
        (InvocationEngine::new(descriptor), transport)
    }

    fn detector_info() -> serde_json::Value {
        json!({
            "inputs": [
                {"name": "label", "type": "text", "default": "face"},
                {"name": "threshold", "type": "number", "step": "0.1", "default": "0.5"}
            ],
            "outputs": [
                {"name": "boxes", "type": "array", "itemType": {"type": "image_bounding_box"}},
                {"name": "count", "type": "number", "step": 1}
            ]
        })
    }

    #[test]
    fn slots_are_seeded_from_defaults() {
        let (engine, _) = engine_for(detector_info());
        let names: Vec<_> = engine.inputs().iter().map(Slot::original_name).collect();
        assert_eq!(names, vec!["label", "threshold", "Query"]);
        assert_eq!(engine.input("Threshold").map(Slot::value), Some(&SlotValue::Real(0.5)));
        assert_eq!(engine.output("count").map(Slot::value), Some(&SlotValue::Integer(0)));
        assert!(!engine.query_enabled());
    }

    #[test]
    fn query_off_means_no_call_and_no_change() {
        let (mut engine, transport) = engine_for(detector_info());
        transport.push_response(Ok(json!({"boxes": [[1, 2, 3, 4]], "count": 1})));
        let before = engine.outputs().to_vec();

        assert_eq!(engine.update().expect("idle"), UpdateOutcome::Idle);
        assert_eq!(transport.query_count(), 0);
        assert_eq!(engine.outputs(), before.as_slice());
    }

    #[test]
    fn query_on_sends_inputs_and_writes_outputs() {
        let (mut engine, transport) = engine_for(detector_info());
        transport.push_response(Ok(json!({"boxes": [[10, 20, 30, 40]], "count": 1})));
        engine.set_input("label", SlotValue::Text("42".into())).expect("text input");
        engine.set_query(true).expect("query slot");

        assert_eq!(engine.update().expect("updated"), UpdateOutcome::Updated);

        let payloads = transport.payloads.lock().expect("payloads");
        assert_eq!(payloads[0].to_string(), r#"{"label":"42","threshold":0.5}"#);
        assert_eq!(
            engine.output("boxes").map(Slot::value),
            Some(&SlotValue::RectList(vec![Rect::new(10.0, 20.0, 20.0, 20.0)]))
        );
        assert_eq!(engine.output("count").map(Slot::value), Some(&SlotValue::Integer(1)));
    }

    #[test]
    fn sustained_trigger_queries_every_tick() {
        let (mut engine, transport) = engine_for(detector_info());
        engine.set_query(true).expect("query slot");
        transport.push_response(Ok(json!({"boxes": [], "count": 0})));
        transport.push_response(Ok(json!({"boxes": [], "count": 2})));

        engine.update().expect("first tick");
        engine.update().expect("second tick");
        assert_eq!(transport.query_count(), 2);
        assert_eq!(engine.output("count").map(Slot::value), Some(&SlotValue::Integer(2)));
    }

    #[test]
    fn failures_leave_outputs_untouched() {
        let (mut engine, transport) = engine_for(detector_info());
        engine.set_query(true).expect("query slot");
        transport.push_response(Ok(json!({"boxes": [[1, 2, 3, 4]]})));
        transport.push_response(Err(not_found()));
        let before = engine.outputs().to_vec();

        let error = engine.update().expect_err("count missing");
        assert!(matches!(error, InvocationError::Codec(CodecError::MissingField { .. })));
        let error = engine.update().expect_err("remote failure");
        assert!(matches!(error, InvocationError::Api(_)));
        assert_eq!(engine.outputs(), before.as_slice());
    }

    #[test]
    fn null_response_is_skipped() {
        let (mut engine, transport) = engine_for(detector_info());
        engine.set_query(true).expect("query slot");
        transport.push_response(Ok(serde_json::Value::Null));
        assert_eq!(engine.update().expect("skipped"), UpdateOutcome::Skipped);
    }

    #[test]
    fn slot_types_never_change() {
        let (mut engine, _) = engine_for(detector_info());
        let error = engine.set_input("threshold", SlotValue::Text("high".into())).expect_err("wrong type");
        assert!(matches!(
            error,
            InvocationError::TypeMismatch {
                expected: SemanticType::Real,
                found: SemanticType::Text,
                ..
            }
        ));
        assert!(matches!(
            engine.set_input("missing", SlotValue::Integer(1)),
            Err(InvocationError::UnknownSlot(_))
        ));
        engine.set_input_at(1, SlotValue::Real(0.9)).expect("by index");
        assert_eq!(engine.input("threshold").map(Slot::value), Some(&SlotValue::Real(0.9)));
    }

    #[test]
    fn inactive_models_have_no_slots() {
        let transport = FakeTransport::new(vec![Err(not_found())]);
        let entry = ModelEntry::hosted("runway/gone", "https://gone.example.com", "tok3n");
        let descriptor = Arc::new(ModelDescriptor::with_transport(&entry, transport.clone()));
        let mut engine = InvocationEngine::new(descriptor);

        assert!(engine.inputs().is_empty());
        assert!(engine.set_query(true).is_err());
        assert_eq!(engine.update().expect("idle"), UpdateOutcome::Idle);
        assert_eq!(transport.query_count(), 0);
        assert!(engine.descriptor().is_not_found());
    }

    fn embedding_info() -> serde_json::Value {
        json!({
            "inputs": [{"name": "z", "type": "vector", "length": 4}],
            "outputs": [
                {"name": "caption", "type": "text"},
                {"name": "embedding", "type": "vector", "length": 2}
            ]
        })
    }

    #[test]
    fn vector_inputs_hold_their_declared_length() {
        let (mut engine, transport) = engine_for(embedding_info());
        let error = engine.set_input("z", SlotValue::Vector(vec![1.0])).expect_err("too short");
        assert!(matches!(
            error,
            InvocationError::LengthMismatch {
                expected: 4,
                found: 1,
                ..
            }
        ));

        engine.set_query(true).expect("query slot");
        transport.push_response(Ok(json!({"caption": "", "embedding": [0.0, 0.0]})));
        engine.update().expect("default vector is sent");
        let payloads = transport.payloads.lock().expect("payloads");
        assert_eq!(payloads[0], json!({"z": [0.0, 0.0, 0.0, 0.0]}));
    }

    #[test]
    fn wrong_length_vector_outputs_write_nothing() {
        let (mut engine, transport) = engine_for(embedding_info());
        engine.set_query(true).expect("query slot");
        transport.push_response(Ok(json!({"caption": "changed", "embedding": [1.0, 2.0, 3.0]})));

        let error = engine.update().expect_err("length mismatch");
        assert!(matches!(error, InvocationError::LengthMismatch { expected: 2, found: 3, .. }));
        assert_eq!(engine.output("caption").map(Slot::value), Some(&SlotValue::Text(String::new())));
        assert_eq!(engine.output("embedding").map(Slot::value), Some(&SlotValue::Vector(vec![0.0, 0.0])));
    }
}
