//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers
//! - Translate the first delivered signal into a [`TerminationSignal`]
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered eagerly, so a signal delivered before the
//!   returned future is first polled is not lost
//! - Other signals keep their default disposition

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;

/// A request to stop the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT, or Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Resolves with the first termination signal received.
pub type SignalFuture = Pin<Box<dyn Future<Output = TerminationSignal> + Send>>;

/// Register SIGINT and SIGTERM handlers.
///
/// Must be called from within a Tokio runtime.
#[cfg(unix)]
pub fn listen() -> io::Result<SignalFuture> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(Box::pin(async move {
        tokio::select! {
            Some(()) = interrupt.recv() => TerminationSignal::Interrupt,
            Some(()) = terminate.recv() => TerminationSignal::Terminate,
            else => std::future::pending().await,
        }
    }))
}

/// Register the Ctrl-C handler.
#[cfg(not(unix))]
pub fn listen() -> io::Result<SignalFuture> {
    Ok(ctrl_c())
}

/// Ctrl-C only; used when full signal registration is unavailable.
pub fn ctrl_c() -> SignalFuture {
    Box::pin(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => TerminationSignal::Interrupt,
            Err(e) => {
                tracing::warn!(error = %e, "Ctrl-C handler unavailable");
                std::future::pending().await
            }
        }
    })
}
