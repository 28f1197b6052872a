//! The set of model descriptors built from configuration.

use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use runway_registry::{ConfigError, ModelEntry, ModelsConfig};
use tracing::{info, warn};

use crate::descriptor::ModelDescriptor;
use crate::node::NodeDescription;

/// Every configured model, keyed by full identifier in configuration order.
///
/// A reload rebuilds every descriptor, so schemas resolved before it are
/// dropped and fetched again on next use.
#[derive(Debug, Default)]
pub struct ModelCatalog {
    config: Option<ModelsConfig>,
    entries: Vec<ModelEntry>,
    models: IndexMap<String, Arc<ModelDescriptor>>,
}

impl ModelCatalog {
    /// Build descriptors for a fixed list of entries.
    ///
    /// Entries with an unusable base URL or credential are skipped with a
    /// warning. A repeated identifier keeps its first entry.
    pub fn from_entries(entries: impl IntoIterator<Item = ModelEntry>) -> Self {
        let mut catalog = Self {
            entries: entries.into_iter().collect(),
            ..Self::default()
        };
        catalog.rebuild();
        catalog
    }

    /// Read the model lists under `config` and build descriptors for them.
    pub fn load(config: ModelsConfig) -> Result<Self, ConfigError> {
        let mut catalog = Self {
            entries: config.load()?,
            config: Some(config),
            models: IndexMap::new(),
        };
        catalog.rebuild();
        Ok(catalog)
    }

    /// Re-read configuration (when loaded from disk) and rebuild every
    /// descriptor.
    ///
    /// On a read error the current descriptors are kept.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        if let Some(config) = &self.config {
            self.entries = config.load()?;
        }
        self.rebuild();
        Ok(())
    }

    fn rebuild(&mut self) {
        let mut models = IndexMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            let descriptor = match ModelDescriptor::from_entry(entry) {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    warn!(model = %entry.identifier, error = %error, "skipping model");
                    continue;
                }
            };
            match models.entry(entry.identifier.clone()) {
                Entry::Occupied(_) => warn!(model = %entry.identifier, "duplicate model identifier ignored"),
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(descriptor));
                }
            }
        }
        info!(count = models.len(), "model catalog built");
        self.models = models;
    }

    /// Find a model by full identifier, falling back to its short name.
    pub fn find(&self, name: &str) -> Option<&Arc<ModelDescriptor>> {
        self.models
            .get(name)
            .or_else(|| self.models.values().find(|descriptor| descriptor.short_name() == name))
    }

    pub fn models(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Resolve every model and describe it for node registration.
    pub fn descriptions(&self) -> Vec<NodeDescription> {
        self.models()
            .map(|descriptor| {
                descriptor.resolve();
                descriptor.describe()
            })
            .collect()
    }
}
