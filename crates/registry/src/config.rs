use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::{env, fs, io};

use dirs_next::config_dir;
use runway_util::expand_tilde;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{ModelEntry, ModelKind, parse_model_lines};

/// Environment variable overriding the model list directory.
pub const MODELS_DIR_ENV: &str = "RUNWAY_MODELS_DIR";
pub const HOSTED_MODELS_FILE: &str = "hosted-models.txt";
pub const LOCAL_MODELS_FILE: &str = "local-models.txt";

/// Location of the model list files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelsConfig {
    pub directory: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self::new(default_models_dir())
    }
}

impl ModelsConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn hosted_path(&self) -> PathBuf {
        self.directory.join(HOSTED_MODELS_FILE)
    }

    pub fn local_path(&self) -> PathBuf {
        self.directory.join(LOCAL_MODELS_FILE)
    }

    /// Read hosted models first, then local ones.
    ///
    /// A missing directory or file contributes no models. Any other I/O
    /// failure is returned.
    pub fn load(&self) -> Result<Vec<ModelEntry>, ConfigError> {
        let mut entries = Vec::new();
        if !self.directory.is_dir() {
            debug!(directory = %self.directory.display(), "model list directory not found");
            return Ok(entries);
        }

        if let Some(text) = read_optional(&self.hosted_path())? {
            entries.extend(parse_model_lines(&text, ModelKind::Hosted));
        }
        if let Some(text) = read_optional(&self.local_path())? {
            entries.extend(parse_model_lines(&text, ModelKind::Local));
        }

        info!(
            directory = %self.directory.display(),
            count = entries.len(),
            "loaded model list"
        );
        Ok(entries)
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Get the default directory holding the model list files.
pub fn default_models_dir() -> PathBuf {
    if let Ok(path) = env::var(MODELS_DIR_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("runway")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read model list {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
