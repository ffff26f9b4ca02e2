//! Shutdown coordination for a run.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use crate::lifecycle::signals::{self, TerminationSignal};

const ACTIVE: u8 = 0;
const CANCEL_REQUESTED: u8 = 1;
const DONE: u8 = 2;

/// Where a run is in its cancellation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No termination request yet.
    Active,
    /// A signal arrived and the token was cancelled.
    CancelRequested,
    /// The run finished.
    Done,
}

impl ControllerState {
    fn from_u8(v: u8) -> Self {
        match v {
            ACTIVE => ControllerState::Active,
            CANCEL_REQUESTED => ControllerState::CancelRequested,
            _ => ControllerState::Done,
        }
    }
}

/// Owns the run's cancellation token and the signal listener that cancels it.
///
/// Cancellation is cooperative: the token is only a signal, consumers decide
/// how to wind down.
#[derive(Debug)]
pub struct CancellationController {
    token: CancellationToken,
    dismiss: CancellationToken,
    state: Arc<AtomicU8>,
    listener: JoinHandle<()>,
}

impl CancellationController {
    /// Arm on SIGINT / SIGTERM.
    ///
    /// Handlers are registered before this returns.
    pub fn arm() -> Self {
        let source = match signals::listen() {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(error = %e, "Signal handler registration failed, falling back to Ctrl-C");
                signals::ctrl_c()
            }
        };
        Self::arm_with(source)
    }

    /// Arm on an arbitrary termination source.
    pub fn arm_with<F>(source: F) -> Self
    where
        F: Future<Output = TerminationSignal> + Send + 'static,
    {
        let token = CancellationToken::new();
        let dismiss = CancellationToken::new();
        let state = Arc::new(AtomicU8::new(ACTIVE));

        let listener = tokio::spawn(
            listen(source, token.clone(), dismiss.clone(), state.clone())
                .in_current_span()
                .with_current_subscriber(),
        );

        Self {
            token,
            dismiss,
            state,
            listener,
        }
    }

    /// The cancellable context handed to the application.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn state(&self) -> ControllerState {
        ControllerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// End the run: dismiss the listener and cancel the token so anything
    /// still holding it winds down.
    pub async fn finish(self) -> ControllerState {
        self.state.store(DONE, Ordering::SeqCst);
        self.dismiss.cancel();
        self.token.cancel();

        if let Err(e) = self.listener.await {
            tracing::warn!(error = %e, "Signal listener ended abnormally");
        }
        ControllerState::Done
    }
}

async fn listen<F>(source: F, token: CancellationToken, dismiss: CancellationToken, state: Arc<AtomicU8>)
where
    F: Future<Output = TerminationSignal>,
{
    tokio::select! {
        signal = source => {
            tracing::info!(signal = %signal, "Signal received");
            if state
                .compare_exchange(ACTIVE, CANCEL_REQUESTED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                token.cancel();
            }
        }
        _ = dismiss.cancelled() => {}
    }
}
