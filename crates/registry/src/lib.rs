//! Registry crate for the list of configured Runway models.
//!
//! Models are declared in two plain-text files inside a configuration
//! directory: `hosted-models.txt` (`identifier, baseUrl, token` per line) and
//! `local-models.txt` (`identifier, baseUrl` per line). This crate parses
//! those files into [`ModelEntry`] values; building live model descriptors
//! from them is the engine's job.

pub mod config;
pub mod models;

pub use config::{ConfigError, HOSTED_MODELS_FILE, LOCAL_MODELS_FILE, MODELS_DIR_ENV, ModelsConfig, default_models_dir};
pub use models::{ModelEntry, ModelKind, parse_model_lines};
