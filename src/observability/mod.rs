//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Runner and application produce:
//!     → logging.rs (structured, leveled records tagged app / app_v)
//!     → metrics.rs (Prometheus facade, scraped from /metrics)
//!
//! Consumers:
//!     → Terminal (formatted text) or log aggregation (JSON lines)
//!     → Prometheus scrape on the auxiliary HTTP server
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{LogDestination, LogLevel, LogSink, Logger};
