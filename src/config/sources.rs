//! Configuration sources and their loading strategies.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::env::Environment;
use crate::config::loader::{load_file, ConfigError};
use crate::config::overlay::{apply_env_checked, merge};

/// Extensions tried for each convention file, in priority order.
pub const CONVENTION_EXTENSIONS: [&str; 2] = ["yaml", "json"];

/// One layer of configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// File found by naming convention; absence is not an error.
    ConventionFile(PathBuf),
    /// File named explicitly; it must exist.
    ExplicitFile(PathBuf),
    /// Environment variables sharing a prefix.
    EnvPrefix(String),
}

/// What applying a source did to the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Loaded,
    Skipped,
}

impl ConfigSource {
    /// Convention files for `base` in the working `dir`.
    pub fn convention(dir: &Path, base: &str) -> Vec<ConfigSource> {
        CONVENTION_EXTENSIONS
            .iter()
            .map(|ext| ConfigSource::ConventionFile(dir.join(format!("{base}.{ext}"))))
            .collect()
    }

    /// Apply this source on top of `tree`.
    pub fn apply(&self, tree: &mut Value, env: &Environment) -> Result<Applied, ConfigError> {
        self.apply_checked(tree, env, &|_| Ok(()))
    }

    /// Apply this source, then have `check` validate the merged tree.
    ///
    /// A file whose values `check` rejects fails with its own path, even when
    /// a later source would overwrite them.
    pub fn apply_checked(
        &self,
        tree: &mut Value,
        env: &Environment,
        check: &dyn Fn(&Value) -> Result<(), String>,
    ) -> Result<Applied, ConfigError> {
        let path = match self {
            ConfigSource::ConventionFile(path) => match load_file(path) {
                Ok(layer) => {
                    merge_layer(tree, layer);
                    path
                }
                Err(e) if e.is_not_found() => return Ok(Applied::Skipped),
                Err(e) => return Err(e),
            },
            ConfigSource::ExplicitFile(path) => {
                merge_layer(tree, load_file(path)?);
                path
            }
            ConfigSource::EnvPrefix(prefix) => {
                apply_env_checked(tree, env, prefix, check)?;
                return Ok(Applied::Loaded);
            }
        };

        check(tree).map_err(|message| ConfigError::Invalid {
            path: path.clone(),
            message,
        })?;
        Ok(Applied::Loaded)
    }

    /// File path of a file-based source.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::ConventionFile(path) | ConfigSource::ExplicitFile(path) => Some(path),
            ConfigSource::EnvPrefix(_) => None,
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::ConventionFile(path) | ConfigSource::ExplicitFile(path) => {
                write!(f, "{}", path.display())
            }
            ConfigSource::EnvPrefix(prefix) => write!(f, "env:{prefix}_*"),
        }
    }
}

fn merge_layer(tree: &mut Value, layer: Value) {
    // An empty document sets nothing.
    if !layer.is_null() {
        merge(tree, layer);
    }
}
