//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Error type for configuration loading and resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("config file {} not found", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file content is not valid for its format.
    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The file parsed, but its values do not fit the configuration type.
    #[error("invalid config file {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },

    /// The base configuration value could not be represented as a mapping.
    #[error("failed to encode base config: {0}")]
    Encode(#[source] serde_json::Error),

    /// An environment variable carries a value that does not fit its field.
    #[error("invalid value in environment variable {key}: {message}")]
    EnvOverlay { key: String, message: String },

    /// The merged configuration no longer fits the configuration type.
    #[error("failed to decode merged config: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ConfigError {
    /// The file path involved in the failure, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::NotFound { path }
            | ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the failure only means the file is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::NotFound { .. })
    }
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    /// Pick the format from the file extension.
    ///
    /// Unknown extensions fall back to YAML, which also accepts JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => FileFormat::Json,
            Some("toml") => FileFormat::Toml,
            _ => FileFormat::Yaml,
        }
    }

    fn parse(self, content: &str) -> Result<Value, String> {
        if content.trim().is_empty() {
            return Ok(Value::Null);
        }
        match self {
            FileFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            FileFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Read and parse a configuration file into a generic value tree.
///
/// An empty file yields `Value::Null`.
pub fn load_file(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    FileFormat::from_path(path)
        .parse(&content)
        .map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
}
