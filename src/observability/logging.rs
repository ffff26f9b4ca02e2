//! Structured logging.
//!
//! # Responsibilities
//! - Pick the minimum level from `APP_DEBUG`
//! - Pick a human-readable or JSON writer depending on the terminal
//! - Bind every record to the `app` / `app_v` fields
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for log aggregation, formatted text for terminals
//! - The logger is a scoped dispatcher, never the process-global default

use std::future::Future;
use std::io::{self, IsTerminal};

use tracing::instrument::{Instrumented, WithDispatch, WithSubscriber};
use tracing::{Dispatch, Instrument, Span};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

use crate::config::Environment;
use crate::lifecycle::startup::AppIdentity;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Minimum severity of emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    /// `Debug` when `APP_DEBUG` is `true` or `1`, `Info` otherwise.
    pub fn from_env(env: &Environment) -> Self {
        if env.debug_enabled() {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }

    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
        }
    }
}

/// Where the primary log stream goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Formatted, colored text on stderr.
    Terminal,
    /// JSON lines on stderr.
    Plain,
}

impl LogDestination {
    /// `Terminal` when stdout is attached to a terminal.
    pub fn detect() -> Self {
        if io::stdout().is_terminal() {
            LogDestination::Terminal
        } else {
            LogDestination::Plain
        }
    }
}

/// Builder for the run's logger.
pub struct LogSink {
    level: LogLevel,
    destination: LogDestination,
    writers: Vec<BoxMakeWriter>,
}

impl LogSink {
    pub fn new(level: LogLevel, destination: LogDestination) -> Self {
        Self {
            level,
            destination,
            writers: Vec::new(),
        }
    }

    /// Also write every record, as JSON lines, to `writer`.
    pub fn with_writer(mut self, writer: BoxMakeWriter) -> Self {
        self.writers.push(writer);
        self
    }

    /// Construct the logger. Nothing is written until the first record.
    pub fn build(self, identity: &AppIdentity) -> Logger {
        let filter = self.level.as_filter();

        let mut layers: Vec<BoxedLayer> = Vec::with_capacity(self.writers.len() + 1);
        layers.push(match self.destination {
            LogDestination::Terminal => fmt::layer()
                .with_writer(io::stderr)
                .with_filter(filter)
                .boxed(),
            LogDestination::Plain => fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_filter(filter)
                .boxed(),
        });
        for writer in self.writers {
            layers.push(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_filter(filter)
                    .boxed(),
            );
        }

        let dispatch = Dispatch::new(Registry::default().with(layers));
        let span = tracing::dispatcher::with_default(&dispatch, || {
            tracing::info_span!("app", app = %identity.name(), app_v = %identity.version())
        });

        Logger {
            dispatch,
            span,
            level: self.level,
            destination: self.destination,
        }
    }
}

/// A leveled logger bound to the application identity.
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
    span: Span,
    level: LogLevel,
    destination: LogDestination,
}

impl Logger {
    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn destination(&self) -> LogDestination {
        self.destination
    }

    /// The dispatcher records are sent to.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// The span carrying the `app` / `app_v` fields.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run `f` with this logger as the thread's default.
    pub fn scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        tracing::dispatcher::with_default(&self.dispatch, || self.span.in_scope(f))
    }

    /// Attach this logger to a future, including everything it polls.
    ///
    /// Tasks spawned from inside the future need
    /// [`WithSubscriber::with_current_subscriber`] to keep logging here.
    pub fn attach<F: Future>(&self, fut: F) -> WithDispatch<Instrumented<F>> {
        fut.instrument(self.span.clone())
            .with_subscriber(self.dispatch.clone())
    }
}
