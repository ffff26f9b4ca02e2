//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! base value (typed, from the caller)
//!     → serialized to a value tree
//!     → sources.rs applies each layer in order
//!         (loader.rs parses files, overlay.rs merges and maps env vars)
//!     → decoded back into the caller's type
//!     → immutable for the rest of the run
//! ```
//!
//! # Design Decisions
//! - Convention files are optional; an explicit path must exist
//! - Environment always wins over files
//! - The environment is read from a snapshot, never from the live process

pub mod env;
pub mod loader;
pub mod overlay;
pub mod resolver;
pub mod sources;

pub use env::Environment;
pub use loader::{ConfigError, FileFormat};
pub use resolver::{app_env_prefix, ConfigResolver, DEFAULT_ENV_PREFIX};
pub use sources::ConfigSource;
