use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::generate::GenerateError;

/// Key of the generator's own output-path setting.
pub const OUTPUT_KEY: &str = "output";

/// A documentation-generation config, kept opaque apart from its output path.
#[derive(Debug, Clone, PartialEq)]
pub struct DocConfig {
    source: PathBuf,
    document: Value,
}

impl DocConfig {
    /// Load a config file. YAML when the extension is `.yaml`/`.yml`, JSON otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GenerateError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| GenerateError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let document: Value = if is_yaml {
            serde_yaml::from_str(&raw).map_err(|e| GenerateError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_json::from_str(&raw).map_err(|e| GenerateError::ConfigParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        Self::from_value(path, document)
    }

    /// Wrap an already parsed document. The document must be a mapping.
    pub fn from_value<P: AsRef<Path>>(source: P, document: Value) -> Result<Self, GenerateError> {
        if !document.is_object() {
            return Err(GenerateError::ConfigParse {
                path: source.as_ref().to_path_buf(),
                message: "top-level value must be a mapping".to_string(),
            });
        }
        Ok(Self {
            source: source.as_ref().to_path_buf(),
            document,
        })
    }

    /// Unset the generator's output path so it returns HTML inline instead of writing a file.
    pub fn reset_output(&mut self) {
        if let Some(map) = self.document.as_object_mut() {
            map.insert(OUTPUT_KEY.to_string(), Value::Null);
        }
    }

    pub fn output(&self) -> Option<&Value> {
        self.document.get(OUTPUT_KEY)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn as_json(&self) -> &Value {
        &self.document
    }

    pub fn trace_loaded(&self) {
        info!(
            config_path = %self.source.display(),
            keys = self.document.as_object().map(|m| m.len()).unwrap_or(0),
            "Loaded documentation config"
        );
        debug!(document = %self.document, "Documentation config loaded (full debug)");
    }
}
