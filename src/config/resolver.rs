//! Layered configuration resolution.
//!
//! # Data Flow
//! ```text
//! base value (C)
//!     → config.yaml → config.json
//!     → {app}.yaml → {app}.json
//!     → $APP_CONFIG_PATH
//!     → APP_* environment variables
//!     → resolved value (C)
//! ```

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::env::{Environment, CONFIG_PATH_VAR};
use crate::config::loader::ConfigError;
use crate::config::overlay::env_key;
use crate::config::sources::{Applied, ConfigSource};

/// Prefix used for the environment overlay unless overridden.
pub const DEFAULT_ENV_PREFIX: &str = "APP";

/// Environment prefix derived from an application name.
///
/// `my-app` becomes `APP_MY_APP`.
pub fn app_env_prefix(app_name: &str) -> String {
    if app_name.is_empty() {
        return DEFAULT_ENV_PREFIX.to_string();
    }
    format!("{DEFAULT_ENV_PREFIX}_{}", env_key(app_name))
}

/// Merges configuration sources, in a fixed order, over a base value.
#[derive(Debug, Clone)]
pub struct ConfigResolver<'a> {
    env: &'a Environment,
    app_name: String,
    dir: PathBuf,
    env_prefix: String,
}

impl<'a> ConfigResolver<'a> {
    /// Create a resolver reading files from the working directory.
    pub fn new(env: &'a Environment, app_name: impl Into<String>) -> Self {
        Self {
            env,
            app_name: app_name.into(),
            dir: PathBuf::new(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Look for convention files in `dir` instead of the working directory.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// Use a different environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// The sources that apply to this run, in the order they are applied.
    pub fn sources(&self) -> Vec<ConfigSource> {
        let mut sources = ConfigSource::convention(&self.dir, "config");
        if !self.app_name.is_empty() {
            sources.extend(ConfigSource::convention(&self.dir, &self.app_name));
        }
        if let Some(path) = self.env.non_empty(CONFIG_PATH_VAR) {
            sources.push(ConfigSource::ExplicitFile(PathBuf::from(path)));
        }
        sources.push(ConfigSource::EnvPrefix(self.env_prefix.clone()));
        sources
    }

    /// Resolve a typed configuration value.
    ///
    /// Every layer is checked against `C` as it is applied, so a failure
    /// names the file or variable that introduced it.
    pub fn resolve<C>(&self, base: C) -> Result<C, ConfigError>
    where
        C: Serialize + DeserializeOwned,
    {
        let tree = serde_json::to_value(&base).map_err(ConfigError::Encode)?;
        let check = |tree: &Value| C::deserialize(tree).map(drop).map_err(|e| e.to_string());
        let tree = self.apply_sources(tree, &check)?;
        serde_json::from_value(tree).map_err(ConfigError::Decode)
    }

    /// Resolve an untyped configuration tree.
    pub fn resolve_value(&self, tree: Value) -> Result<Value, ConfigError> {
        self.apply_sources(tree, &|_| Ok(()))
    }

    fn apply_sources(
        &self,
        mut tree: Value,
        check: &dyn Fn(&Value) -> Result<(), String>,
    ) -> Result<Value, ConfigError> {
        for source in self.sources() {
            if source.apply_checked(&mut tree, self.env, check)? == Applied::Skipped {
                continue;
            }
            if let Some(path) = source.path() {
                tracing::debug!(path = %path.display(), "Config file loaded");
            }
        }
        Ok(tree)
    }
}
