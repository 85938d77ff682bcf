// Desired-preferences YAML document.
//
// One snake_case key per preference; missing keys take the daemon
// defaults, unknown keys are rejected. An empty file means "all defaults".

use std::path::{Path, PathBuf};

use edged_core::{CoreError, DesiredSource, Preferences};

use crate::ConfigError;

/// The operator's desired preferences, read from disk on demand.
#[derive(Debug, Clone)]
pub struct PrefsDocument {
    path: PathBuf,
}

impl PrefsDocument {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document.
    pub fn read(&self) -> Result<Preferences, ConfigError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
            path: self.path.clone(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ConfigError::Document {
            path: self.path.clone(),
            source,
        })
    }

    /// Parse document text.
    pub fn parse(raw: &str) -> Result<Preferences, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Preferences::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Render preferences as document text.
    pub fn render(prefs: &Preferences) -> Result<String, ConfigError> {
        serde_yaml::to_string(prefs).map_err(|e| ConfigError::Serialization(e.to_string()))
    }
}

impl DesiredSource for PrefsDocument {
    fn load(&self) -> Result<Preferences, CoreError> {
        self.read().map_err(|e| CoreError::SourceRead {
            message: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
