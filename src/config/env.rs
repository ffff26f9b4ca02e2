//! Process environment snapshot.
//!
//! # Responsibilities
//! - Capture environment variables once per run
//! - Answer the well-known `APP_*` lookups used during startup
//!
//! # Design Decisions
//! - Immutable after capture: every startup step sees the same values
//! - Empty values are treated as unset for path/address lookups

use std::collections::BTreeMap;

/// Enables debug-level logging when set to `true` or `1`.
pub const DEBUG_VAR: &str = "APP_DEBUG";
/// Application name used when none is given programmatically.
pub const NAME_VAR: &str = "APP_NAME";
/// Application version used when none is given programmatically.
pub const VERSION_VAR: &str = "APP_VERSION";
/// Explicit configuration file path.
pub const CONFIG_PATH_VAR: &str = "APP_CONFIG_PATH";
/// Bind address of the auxiliary HTTP server.
pub const HTTP_SERVER_ADDR_VAR: &str = "APP_HTTP_SERVER_ADDR";

/// Immutable view of environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    ///
    /// Variables that are not valid unicode are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Get a variable's raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Get a variable's value, treating an empty string as unset.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Whether `APP_DEBUG` requests debug logging.
    pub fn debug_enabled(&self) -> bool {
        matches!(self.get(DEBUG_VAR), Some("true") | Some("1"))
    }

    /// Iterate over variables whose name starts with `prefix_`.
    ///
    /// Yields the remainder of the name (after the underscore) and the value.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars.iter().filter_map(move |(k, v)| {
            let rest = k.strip_prefix(prefix)?.strip_prefix('_')?;
            (!rest.is_empty()).then_some((rest, v.as_str()))
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
