//! Auxiliary HTTP server.
//!
//! # Responsibilities
//! - Serve the routes registered through the runtime handle
//! - Run on a background task next to the application
//! - Shut down gracefully when asked
//!
//! # Design Decisions
//! - Best-effort: bind and serve failures are logged, never propagated
//! - No restart after a failure
//! - `:port` addresses bind every interface

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use crate::config::env::{Environment, HTTP_SERVER_ADDR_VAR};

/// Bind address used when none is configured.
pub const DEFAULT_ADDR: &str = ":9000";

/// Error type for stopping an auxiliary server.
#[derive(Debug, Error)]
pub enum AuxServerError {
    /// The server task panicked or was aborted.
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Implementation-specific failure.
    #[error("{0}")]
    Other(String),
}

/// A best-effort server running next to the application.
#[async_trait]
pub trait AuxServer: Send {
    /// Launch the server on a background task and return immediately.
    fn start(&mut self, router: Router);

    /// Ask the server to stop and wait for it.
    async fn stop(&mut self) -> Result<(), AuxServerError>;

    /// Address for logging.
    fn addr(&self) -> &str;

    /// Tear the server down without waiting, after a stop timed out.
    fn abort(&mut self) {}
}

/// Axum-backed auxiliary server.
pub struct HttpServer {
    addr: String,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HttpServer {
    /// Create a server that will bind `addr` when started.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            shutdown: CancellationToken::new(),
            task: None,
        }
    }

    /// Bind address from `APP_HTTP_SERVER_ADDR`, or [`DEFAULT_ADDR`].
    pub fn from_env(env: &Environment) -> Self {
        Self::new(env.non_empty(HTTP_SERVER_ADDR_VAR).unwrap_or(DEFAULT_ADDR))
    }

    /// Whether the background task was launched.
    pub fn is_started(&self) -> bool {
        self.task.is_some()
    }
}

#[async_trait]
impl AuxServer for HttpServer {
    fn start(&mut self, router: Router) {
        let router = router.layer(TraceLayer::new_for_http());
        let addr = bind_addr(&self.addr);
        let shutdown = self.shutdown.clone();

        self.task = Some(tokio::spawn(
            serve(addr, router, shutdown)
                .in_current_span()
                .with_current_subscriber(),
        ));
    }

    async fn stop(&mut self) -> Result<(), AuxServerError> {
        self.shutdown.cancel();
        // The handle stays in place until the task ends so `abort` can reach it.
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let result = task.await;
        self.task = None;
        result.map_err(AuxServerError::from)
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            tracing::warn!(addr = %self.addr, "HTTP server task aborted");
            task.abort();
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Expand a Go-style `:port` address to all interfaces.
pub fn bind_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

async fn serve(addr: String, router: Router, shutdown: CancellationToken) {
    tracing::info!(addr = %addr, "HTTP server is starting");

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "HTTP server bind failed");
            return;
        }
    };

    match axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
    {
        Ok(()) => tracing::info!("HTTP server closed"),
        Err(e) => tracing::error!(error = %e, "HTTP server serve failed"),
    }
}
