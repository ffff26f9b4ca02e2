//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder behind the `metrics` facade
//! - Expose the scrape endpoint on the auxiliary HTTP server
//! - Publish the application identity
//!
//! # Metrics
//! - `app_info` (gauge): always 1, labelled with `app` and `version`
//!
//! # Design Decisions
//! - The recorder is process-global; it is installed at most once and the
//!   handle is reused by later runs in the same process

use std::sync::OnceLock;

use axum::routing::get;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::http::HttpRoutes;
use crate::lifecycle::AppIdentity;

/// Path of the scrape endpoint.
pub const METRICS_PATH: &str = "/metrics";

static RECORDER: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, or reuse the one already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = RECORDER.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(RECORDER.get_or_init(|| handle).clone())
}

/// Register the scrape endpoint and publish `app_info`.
///
/// Returns `false` when the recorder could not be installed; the failure is
/// logged and the endpoint is not registered.
pub fn register(routes: &HttpRoutes, identity: &AppIdentity) -> bool {
    let handle = match install_recorder() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Metrics recorder install failed");
            return false;
        }
    };

    record_app_info(identity);
    routes.route(
        METRICS_PATH,
        get(move || std::future::ready(handle.render())),
    )
}

/// Set the `app_info` gauge for `identity`.
pub fn record_app_info(identity: &AppIdentity) {
    metrics::gauge!(
        "app_info",
        "app" => identity.name().to_string(),
        "version" => identity.version().to_string()
    )
    .set(1.0);
}
