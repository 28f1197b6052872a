//! One configured model and its lazily resolved schema.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use runway_api::{ApiError, RunwayClient, normalize_base_url};
use runway_registry::{ModelEntry, ModelKind};
use runway_types::{Diagnostic, FieldDescriptor};
use tracing::{debug, info, warn};

use crate::node::{NodeDescription, PinDescription};
use crate::schema::{ResolvedSchema, SchemaError, resolve_schema};
use crate::transport::ModelTransport;

/// Host category every model node is registered under.
pub const NODE_CATEGORY: &str = "ML.RunwayML";
const DASHBOARD_URL_PREFIX: &str = "https://app.runwayml.com/models/";

/// Where a descriptor is in its resolution lifecycle.
#[derive(Clone, Debug, Default)]
pub enum ResolutionState {
    /// Nothing fetched yet, or the last attempt failed transiently.
    #[default]
    Unresolved,
    /// The `info` endpoint answered 404; the model is inactive.
    NotFound,
    /// The metadata document could not be interpreted. Retried like
    /// `Unresolved`.
    Invalid(SchemaError),
    Resolved(Arc<ResolvedSchema>),
}

/// A remote model as configured, plus whatever has been learned about it.
///
/// Descriptors are shared between every invocation built from them. The
/// schema is fetched at most once successfully; afterwards it never changes.
pub struct ModelDescriptor {
    full_identifier: String,
    short_name: String,
    base_url: String,
    kind: ModelKind,
    transport: Arc<dyn ModelTransport>,
    state: Mutex<ResolutionState>,
}

impl ModelDescriptor {
    /// Build a descriptor backed by a [`RunwayClient`].
    ///
    /// # Errors
    /// Fails when the entry's base URL or credential cannot be used.
    pub fn from_entry(entry: &ModelEntry) -> Result<Self, ApiError> {
        let client = RunwayClient::new(&entry.base_url, entry.credential.as_deref())?;
        Ok(Self::with_transport(entry, Arc::new(client)))
    }

    /// Build a descriptor that talks to the model through `transport`.
    pub fn with_transport(entry: &ModelEntry, transport: Arc<dyn ModelTransport>) -> Self {
        Self {
            full_identifier: entry.identifier.clone(),
            short_name: entry.short_name().to_string(),
            base_url: normalize_base_url(&entry.base_url),
            kind: entry.kind(),
            transport,
            state: Mutex::new(ResolutionState::Unresolved),
        }
    }

    /// Fetch and interpret the model's metadata unless that already succeeded.
    ///
    /// A 404 marks the model [`ResolutionState::NotFound`] and an
    /// uninterpretable document [`ResolutionState::Invalid`]; the next call
    /// checks again in both cases. Any other failure is logged and leaves the
    /// state as it was.
    pub fn resolve(&self) {
        let mut state = self.lock_state();
        if matches!(*state, ResolutionState::Resolved(_)) {
            return;
        }

        debug!(model = %self.full_identifier, base_url = %self.base_url, "resolving model schema");
        match self.transport.fetch_info() {
            Ok(document) => match resolve_schema(&document) {
                Ok(schema) => {
                    info!(
                        model = %self.full_identifier,
                        inputs = schema.inputs().len(),
                        outputs = schema.outputs().len(),
                        "model schema resolved"
                    );
                    *state = ResolutionState::Resolved(Arc::new(schema));
                }
                Err(error) => {
                    warn!(model = %self.full_identifier, error = %error, "model metadata could not be interpreted");
                    *state = ResolutionState::Invalid(error);
                }
            },
            Err(error) if error.is_not_found() => {
                warn!(model = %self.full_identifier, base_url = %self.base_url, "model is inactive");
                *state = ResolutionState::NotFound;
            }
            Err(error) => {
                warn!(model = %self.full_identifier, error = %error, "model schema fetch failed");
            }
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.lock_state().clone()
    }

    /// The resolved schema, if resolution has succeeded.
    pub fn schema(&self) -> Option<Arc<ResolvedSchema>> {
        match &*self.lock_state() {
            ResolutionState::Resolved(schema) => Some(Arc::clone(schema)),
            ResolutionState::Unresolved | ResolutionState::NotFound | ResolutionState::Invalid(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.lock_state(), ResolutionState::Resolved(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(*self.lock_state(), ResolutionState::NotFound)
    }

    pub fn summary(&self) -> Option<String> {
        self.schema().and_then(|schema| schema.summary().map(str::to_string))
    }

    /// Input fields including the trailing `Query` trigger; empty until resolved.
    pub fn inputs(&self) -> Vec<FieldDescriptor> {
        self.schema().map(|schema| schema.inputs().to_vec()).unwrap_or_default()
    }

    /// Output fields; empty until resolved.
    pub fn outputs(&self) -> Vec<FieldDescriptor> {
        self.schema().map(|schema| schema.outputs().to_vec()).unwrap_or_default()
    }

    pub fn full_identifier(&self) -> &str {
        &self.full_identifier
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// Base URL ending with exactly one `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn is_local(&self) -> bool {
        self.kind == ModelKind::Local
    }

    pub fn category(&self) -> &'static str {
        NODE_CATEGORY
    }

    /// Diagnostics for the host: the inactive-model warning, an error for
    /// unreadable metadata, and any fields skipped during resolution.
    pub fn messages(&self) -> Vec<Diagnostic> {
        match &*self.lock_state() {
            ResolutionState::NotFound => vec![Diagnostic::warning(format!(
                "Model inactive: {}\nActivate it in your RunwayML dashboard and then restart.",
                self.base_url
            ))],
            ResolutionState::Invalid(error) => vec![Diagnostic::error(format!("Model metadata unreadable: {error}"))],
            ResolutionState::Resolved(schema) => schema.warnings().to_vec(),
            ResolutionState::Unresolved => Vec::new(),
        }
    }

    /// Dashboard page of a hosted model. Local models have none.
    pub fn dashboard_url(&self) -> Option<String> {
        match self.kind {
            ModelKind::Hosted => Some(format!("{DASHBOARD_URL_PREFIX}{}", self.full_identifier)),
            ModelKind::Local => None,
        }
    }

    /// Open the dashboard page in the default browser.
    ///
    /// Returns `false` without doing anything for local models.
    pub fn open_editor(&self) -> io::Result<bool> {
        let Some(url) = self.dashboard_url() else {
            return Ok(false);
        };
        info!(model = %self.full_identifier, %url, "opening model dashboard");
        open::that(&url)?;
        Ok(true)
    }

    /// Host-facing description built from the current state.
    pub fn describe(&self) -> NodeDescription {
        let schema = self.schema();
        let pins = |fields: Option<&[FieldDescriptor]>| fields.unwrap_or_default().iter().map(PinDescription::from).collect();
        NodeDescription {
            name: self.short_name.clone(),
            category: NODE_CATEGORY,
            summary: schema.as_ref().and_then(|schema| schema.summary().map(str::to_string)),
            inputs: pins(schema.as_deref().map(ResolvedSchema::inputs)),
            outputs: pins(schema.as_deref().map(ResolvedSchema::outputs)),
            messages: self.messages(),
            dashboard_url: self.dashboard_url(),
        }
    }

    pub(crate) fn transport(&self) -> &dyn ModelTransport {
        self.transport.as_ref()
    }

    fn lock_state(&self) -> MutexGuard<'_, ResolutionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("full_identifier", &self.full_identifier)
            .field("base_url", &self.base_url)
            .field("kind", &self.kind)
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}
