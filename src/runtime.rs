//! Types shared between the runner and the application it drives.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::http::HttpRoutes;
use crate::lifecycle::AppIdentity;
use crate::observability::{LogDestination, LogLevel, Logger};

/// Boxed error accepted from factories and applications.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The resolved configuration of one run.
///
/// Built once, after every source has been applied, and handed to the
/// factory by value.
#[derive(Debug, Clone)]
pub struct RunnerConfig<C> {
    identity: AppIdentity,
    log_level: LogLevel,
    log_destination: LogDestination,
    app: C,
}

impl<C> RunnerConfig<C> {
    pub(crate) fn new(
        identity: AppIdentity,
        log_level: LogLevel,
        log_destination: LogDestination,
        app: C,
    ) -> Self {
        Self {
            identity,
            log_level,
            log_destination,
            app,
        }
    }

    pub fn app_name(&self) -> &str {
        self.identity.name()
    }

    pub fn app_version(&self) -> &str {
        self.identity.version()
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn log_destination(&self) -> LogDestination {
        self.log_destination
    }

    /// The application's own configuration.
    pub fn app(&self) -> &C {
        &self.app
    }

    pub fn into_app(self) -> C {
        self.app
    }
}

/// What the runner shares with the application.
///
/// Cheap to clone; every clone refers to the same run.
#[derive(Clone)]
pub struct RuntimeHandle {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    identity: AppIdentity,
    logger: Logger,
    routes: Option<HttpRoutes>,
    args: Vec<String>,
}

impl RuntimeHandle {
    pub(crate) fn new(
        identity: AppIdentity,
        logger: Logger,
        routes: Option<HttpRoutes>,
        args: Vec<String>,
    ) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                identity,
                logger,
                routes,
                args,
            }),
        }
    }

    pub fn app_name(&self) -> &str {
        self.inner.identity.name()
    }

    pub fn app_version(&self) -> &str {
        self.inner.identity.version()
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.inner.identity
    }

    /// The run's logger.
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// Route registration point, present only when an auxiliary HTTP server
    /// is configured.
    pub fn http(&self) -> Option<&HttpRoutes> {
        self.inner.routes.as_ref()
    }

    /// Process arguments, program name first.
    pub fn args(&self) -> &[String] {
        &self.inner.args
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle")
            .field("identity", &self.inner.identity)
            .field("http", &self.inner.routes.is_some())
            .finish()
    }
}

/// An application driven by the runner.
///
/// `run` receives the run's cancellation token and should return once the
/// token is cancelled or its work is done.
pub trait Application: Send {
    type Error: Into<BoxError>;

    fn run(self, ctx: CancellationToken) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
