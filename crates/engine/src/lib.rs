//! # Runway Engine
//!
//! Turns configured Runway models into typed dataflow nodes.
//!
//! ## Key pieces
//!
//! - **Schema resolution**: [`ModelDescriptor::resolve`] fetches a model's
//!   `info` document once and infers a [`FieldDescriptor`] per field
//!   ([`infer_field`], [`resolve_schema`]).
//! - **Invocation**: [`InvocationEngine`] holds typed input and output slots.
//!   While its trailing `Query` input is on, each [`InvocationEngine::update`]
//!   encodes the inputs, calls `query`, and decodes the response into the
//!   outputs.
//! - **Catalog**: [`ModelCatalog`] builds descriptors from the model lists and
//!   rebuilds all of them on reload.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use runway_engine::{InvocationEngine, ModelDescriptor};
//! use runway_registry::ModelEntry;
//! use runway_types::SlotValue;
//!
//! let entry = ModelEntry::local("gpt-2", "http://localhost:8000");
//! let descriptor = Arc::new(ModelDescriptor::from_entry(&entry)?);
//! let mut engine = InvocationEngine::new(descriptor);
//!
//! engine.set_input("prompt", SlotValue::Text("Once upon a time".into()))?;
//! engine.set_query(true)?;
//! engine.update()?;
//! for output in engine.outputs() {
//!     println!("{}: {}", output.name(), output.value());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod codec;
pub mod descriptor;
pub mod invocation;
pub mod node;
pub mod schema;
pub mod slot;
pub mod transport;

pub use catalog::ModelCatalog;
pub use codec::{CodecError, decode_output, decode_outputs, encode_inputs, encode_value};
pub use descriptor::{ModelDescriptor, NODE_CATEGORY, ResolutionState};
pub use invocation::{InvocationEngine, InvocationError, UpdateOutcome};
pub use node::{NodeDescription, PinDescription};
pub use runway_types::FieldDescriptor;
pub use schema::{MAX_VECTOR_LENGTH, ResolvedSchema, SchemaError, infer_field, resolve_schema};
pub use slot::Slot;
pub use transport::ModelTransport;
