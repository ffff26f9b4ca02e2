//! Run orchestration.
//!
//! # Sequence
//! ```text
//! 1. environment snapshot → identity → logger
//! 2. config resolution                         (fatal)
//! 3. signal listener armed
//! 4. application factory                       (fatal, aux server never started)
//! 5. aux HTTP server started                   (best-effort)
//! 6. application run, until it returns         (fatal)
//! 7. aux HTTP server stopped                   (always, bounded)
//! 8. exit code: 0, or 1 for the first fatal step
//! ```
//!
//! # Design Decisions
//! - Every fatal step logs exactly one record tagged with its `phase`
//! - The aux server never affects the exit code
//! - No retries anywhere

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

use crate::config::{app_env_prefix, ConfigError, ConfigResolver, Environment, DEFAULT_ENV_PREFIX};
use crate::http::{AuxServer, HttpRoutes, HttpServer};
use crate::lifecycle::signals::SignalFuture;
use crate::lifecycle::{AppIdentity, CancellationController, TerminationSignal};
use crate::observability::{metrics, LogDestination, LogLevel, LogSink};
use crate::runtime::{Application, BoxError, RunnerConfig, RuntimeHandle};

/// Upper bound on waiting for the aux server to stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Exit code of a failed run.
pub const EXIT_FAILURE: i32 = 1;

/// A fatal run failure.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Configuration could not be resolved; no application code ran.
    #[error("config load failed: {0}")]
    Config(#[from] ConfigError),

    /// The application factory failed; the aux server was not started.
    #[error("app init failed: {0}")]
    Factory(#[source] BoxError),

    /// The application returned an error.
    #[error("app run failed: {0}")]
    Execution(#[source] BoxError),
}

impl RunnerError {
    /// Name of the step that failed, as logged in the `phase` field.
    pub fn phase(&self) -> &'static str {
        match self {
            RunnerError::Config(_) => "config",
            RunnerError::Factory(_) => "init",
            RunnerError::Execution(_) => "run",
        }
    }

    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }
}

enum EnvPrefix {
    Default,
    FromAppName,
    Custom(String),
}

impl EnvPrefix {
    fn resolve(&self, app_name: &str) -> String {
        match self {
            EnvPrefix::Default => DEFAULT_ENV_PREFIX.to_string(),
            EnvPrefix::FromAppName => app_env_prefix(app_name),
            EnvPrefix::Custom(prefix) => prefix.clone(),
        }
    }
}

enum HttpSetting {
    Disabled,
    FromEnv,
    Addr(String),
    Custom(Box<dyn AuxServer>),
}

/// Bootstraps and drives a single application instance.
pub struct Runner<F, C> {
    factory: F,
    config: C,
    name: Option<String>,
    version: Option<String>,
    env: Option<Environment>,
    config_dir: PathBuf,
    env_prefix: EnvPrefix,
    log_destination: Option<LogDestination>,
    log_writers: Vec<BoxMakeWriter>,
    http: HttpSetting,
    metrics: bool,
    signals: Option<SignalFuture>,
    shutdown_timeout: Duration,
    args: Option<Vec<String>>,
}

impl<F, C> Runner<F, C> {
    /// Create a runner for `factory`, starting from the base `config`.
    pub fn new<A, E>(factory: F, config: C) -> Self
    where
        F: FnOnce(RunnerConfig<C>, &RuntimeHandle) -> Result<A, E>,
    {
        Self {
            factory,
            config,
            name: None,
            version: None,
            env: None,
            config_dir: PathBuf::new(),
            env_prefix: EnvPrefix::Default,
            log_destination: None,
            log_writers: Vec::new(),
            http: HttpSetting::Disabled,
            metrics: false,
            signals: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            args: None,
        }
    }

    /// Application name; `APP_NAME` is used when unset.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Application version; `APP_VERSION` is used when unset.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Use `env` instead of the process environment.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Look for convention config files in `dir`.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Overlay `APP_{NAME}_*` variables instead of `APP_*`.
    pub fn with_app_env_prefix(mut self) -> Self {
        self.env_prefix = EnvPrefix::FromAppName;
        self
    }

    /// Overlay `{prefix}_*` variables.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = EnvPrefix::Custom(prefix.into());
        self
    }

    /// Override terminal detection.
    pub fn with_log_destination(mut self, destination: LogDestination) -> Self {
        self.log_destination = Some(destination);
        self
    }

    /// Also write JSON log records to `writer`.
    pub fn with_log_writer<W>(mut self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.log_writers.push(BoxMakeWriter::new(writer));
        self
    }

    /// Serve registered routes on `addr`.
    pub fn with_http_server(mut self, addr: impl Into<String>) -> Self {
        self.http = HttpSetting::Addr(addr.into());
        self
    }

    /// Serve registered routes on `APP_HTTP_SERVER_ADDR`, default `:9000`.
    pub fn with_default_http_server(mut self) -> Self {
        self.http = HttpSetting::FromEnv;
        self
    }

    /// Use a custom auxiliary server.
    pub fn with_aux_server<S>(mut self, server: S) -> Self
    where
        S: AuxServer + 'static,
    {
        self.http = HttpSetting::Custom(Box::new(server));
        self
    }

    /// Expose Prometheus metrics on `/metrics`.
    ///
    /// Enables the default HTTP server if none is configured.
    pub fn with_metrics_handler(mut self) -> Self {
        self.metrics = true;
        self
    }

    /// Cancel on `source` instead of OS signals.
    pub fn with_termination_signal<S>(mut self, source: S) -> Self
    where
        S: Future<Output = TerminationSignal> + Send + 'static,
    {
        self.signals = Some(Box::pin(source));
        self
    }

    /// Upper bound on waiting for the aux server to stop.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Arguments exposed through [`RuntimeHandle::args`].
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }
}

impl<F, A, E, C> Runner<F, C>
where
    F: FnOnce(RunnerConfig<C>, &RuntimeHandle) -> Result<A, E>,
    A: Application,
    E: Into<BoxError>,
    C: Serialize + DeserializeOwned,
{
    /// Run to completion and return the process exit code.
    pub async fn run(self) -> i32 {
        match self.try_run().await {
            Ok(()) => 0,
            Err(e) => e.exit_code(),
        }
    }

    /// Run to completion.
    ///
    /// Failures are already logged when this returns.
    pub async fn try_run(self) -> Result<(), RunnerError> {
        let Runner {
            factory,
            config,
            name,
            version,
            env,
            config_dir,
            env_prefix,
            log_destination,
            log_writers,
            http,
            metrics: with_metrics,
            signals,
            shutdown_timeout,
            args,
        } = self;

        let env = env.unwrap_or_else(Environment::from_process);
        let identity = AppIdentity::resolve(name, version, &env);
        let log_level = LogLevel::from_env(&env);
        let log_destination = log_destination.unwrap_or_else(LogDestination::detect);
        let logger = log_writers
            .into_iter()
            .fold(LogSink::new(log_level, log_destination), LogSink::with_writer)
            .build(&identity);
        let runtime_logger = logger.clone();

        let run = async move {
            let prefix = env_prefix.resolve(identity.name());
            let resolver = ConfigResolver::new(&env, identity.name())
                .with_dir(config_dir)
                .with_env_prefix(prefix);
            let app_config = match resolver.resolve(config) {
                Ok(app_config) => app_config,
                Err(e) => {
                    let path = e.path().map(|p| p.display().to_string());
                    tracing::error!(
                        phase = "config",
                        path = path.as_deref(),
                        error = %e,
                        "Config load failed"
                    );
                    return Err(RunnerError::Config(e));
                }
            };

            let controller = match signals {
                Some(source) => CancellationController::arm_with(source),
                None => CancellationController::arm(),
            };

            let mut aux: Option<Box<dyn AuxServer>> = match http {
                HttpSetting::Disabled if with_metrics => Some(Box::new(HttpServer::from_env(&env))),
                HttpSetting::Disabled => None,
                HttpSetting::FromEnv => Some(Box::new(HttpServer::from_env(&env))),
                HttpSetting::Addr(addr) => Some(Box::new(HttpServer::new(addr))),
                HttpSetting::Custom(server) => Some(server),
            };
            let routes = aux.as_ref().map(|_| HttpRoutes::new());
            if let (true, Some(routes)) = (with_metrics, routes.as_ref()) {
                metrics::register(routes, &identity);
            }

            let runtime = RuntimeHandle::new(
                identity.clone(),
                runtime_logger,
                routes.clone(),
                args.unwrap_or_else(|| lossy_args(std::env::args_os())),
            );
            let runner_config = RunnerConfig::new(identity, log_level, log_destination, app_config);

            let app = match factory(runner_config, &runtime) {
                Ok(app) => app,
                Err(e) => {
                    let e: BoxError = e.into();
                    tracing::error!(phase = "init", error = %e, "App init failed");
                    controller.finish().await;
                    return Err(RunnerError::Factory(e));
                }
            };

            if let Some(server) = aux.as_mut() {
                let router = routes.as_ref().map(HttpRoutes::seal).unwrap_or_default();
                server.start(router);
            }

            tracing::debug!("App is starting");
            let outcome = app.run(controller.token()).await.map_err(Into::into);
            if let Err(e) = &outcome {
                tracing::error!(phase = "run", error = %e, "App run failed");
            }

            if let Some(server) = aux.as_mut() {
                stop_aux(&mut **server, shutdown_timeout).await;
            }
            controller.finish().await;

            outcome.map_err(RunnerError::Execution)
        };

        logger.attach(run).await
    }
}

/// Stop the aux server, logging instead of propagating any failure.
async fn stop_aux(server: &mut dyn AuxServer, timeout: Duration) {
    tracing::info!(addr = %server.addr(), "HTTP server is shutting down");

    match tokio::time::timeout(timeout, server.stop()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server shutdown failed"),
        Err(_) => {
            tracing::error!(
                timeout_ms = timeout.as_millis() as u64,
                "HTTP server shutdown timed out"
            );
            server.abort();
        }
    }
}

/// Process arguments, with invalid unicode replaced rather than rejected.
fn lossy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Run `factory` with default runner settings and return the exit code.
pub async fn run<F, A, E, C>(factory: F, config: C) -> i32
where
    F: FnOnce(RunnerConfig<C>, &RuntimeHandle) -> Result<A, E>,
    A: Application,
    E: Into<BoxError>,
    C: Serialize + DeserializeOwned,
{
    Runner::new(factory, config).run().await
}
