//! Application bootstrap and runner.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────── Runner ─────────────────────────────┐
//!   │                                                                 │
//!   │  env snapshot ─▶ identity ─▶ LogSink ─▶ ConfigResolver          │
//!   │                                              │                  │
//!   │                                              ▼                  │
//!   │  CancellationController ◀── SIGINT/SIGTERM   factory(cfg, rt)   │
//!   │            │                                 │                  │
//!   │            │ token                           ▼                  │
//!   │            └──────────────────────▶  application.run(token)     │
//!   │                                              ▲                  │
//!   │  aux HttpServer (optional) ── started before ┘ stopped after    │
//!   └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use apprun::{Application, Runner, RunnerConfig, RuntimeHandle};
//! use serde::{Deserialize, Serialize};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Config {
//!     timeout: u64,
//! }
//!
//! struct Worker;
//!
//! impl Application for Worker {
//!     type Error = std::io::Error;
//!
//!     async fn run(self, ctx: CancellationToken) -> Result<(), Self::Error> {
//!         ctx.cancelled().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let code = Runner::new(
//!         |_cfg: RunnerConfig<Config>, _rt: &RuntimeHandle| Ok::<_, std::io::Error>(Worker),
//!         Config { timeout: 30 },
//!     )
//!     .with_name("worker")
//!     .run()
//!     .await;
//!     std::process::exit(code);
//! }
//! ```

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

// Auxiliary surface
pub mod http;

// Orchestration
pub mod runner;
pub mod runtime;

pub use config::{ConfigError, ConfigResolver, ConfigSource, Environment};
pub use http::{AuxServer, AuxServerError, HttpRoutes, HttpServer};
pub use lifecycle::{AppIdentity, CancellationController, ControllerState, TerminationSignal};
pub use observability::{LogDestination, LogLevel, LogSink, Logger};
pub use runner::{run, Runner, RunnerError};
pub use runtime::{Application, BoxError, RunnerConfig, RuntimeHandle};
