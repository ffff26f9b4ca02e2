//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Resolve identity → build logger → resolve config
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → TerminationSignal
//!
//! Shutdown (shutdown.rs):
//!     TerminationSignal → cancel token → application winds down → Done
//! ```
//!
//! # State Machine
//! ```text
//! Active ──signal──▶ CancelRequested ──run returns──▶ Done
//!    └──────────────run returns─────────────────────▶ Done
//! ```
//!
//! # Design Decisions
//! - Signal handlers are armed before the application starts
//! - Cancellation is one-shot: once requested it stays requested

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{CancellationController, ControllerState};
pub use signals::TerminationSignal;
pub use startup::AppIdentity;
