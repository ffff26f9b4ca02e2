//! Auxiliary HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! application factory
//!     → routes.rs (register handlers through the runtime handle)
//!     → server.rs (routes sealed, served on a background task)
//!     → stopped after the application returns
//! ```

pub mod routes;
pub mod server;

pub use routes::HttpRoutes;
pub use server::{AuxServer, AuxServerError, HttpServer, DEFAULT_ADDR};
