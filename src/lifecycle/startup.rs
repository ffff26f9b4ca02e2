//! Startup parameters.
//!
//! # Responsibilities
//! - Settle the application identity once, before anything logs
//!
//! # Design Decisions
//! - Programmatic values win over `APP_NAME` / `APP_VERSION`
//! - Identity is an explicit value threaded through the run, not a global

use std::fmt;

use crate::config::env::{Environment, NAME_VAR, VERSION_VAR};

/// Name and version of the running application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppIdentity {
    name: String,
    version: String,
}

impl AppIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Fill whatever was not given programmatically from the environment.
    pub fn resolve(name: Option<String>, version: Option<String>, env: &Environment) -> Self {
        let pick = |given: Option<String>, var: &str| {
            given
                .filter(|v| !v.is_empty())
                .or_else(|| env.get(var).map(str::to_string))
                .unwrap_or_default()
        };

        Self {
            name: pick(name, NAME_VAR),
            version: pick(version, VERSION_VAR),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}
