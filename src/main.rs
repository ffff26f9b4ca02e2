//! Demo application driven by the runner.
//!
//! Emits a heartbeat on a configurable interval until SIGINT/SIGTERM.
//! Try it with:
//!
//! ```text
//! APP_DEBUG=1 APP_INTERVAL_MS=500 APP_HTTP_SERVER_ADDR=127.0.0.1:9000 apprun-demo
//! curl localhost:9000/metrics
//! ```

use std::convert::Infallible;
use std::time::Duration;

use apprun::{Application, Runner, RunnerConfig, RuntimeHandle};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct HeartbeatConfig {
    /// Interval between beats.
    interval_ms: u64,
    /// Message attached to each beat.
    message: String,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            message: "alive".to_string(),
        }
    }
}

struct Heartbeat {
    config: HeartbeatConfig,
}

impl Application for Heartbeat {
    type Error = Infallible;

    async fn run(self, ctx: CancellationToken) -> Result<(), Self::Error> {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.interval_ms.max(1)));
        let mut beats: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    beats += 1;
                    metrics::counter!("heartbeat_beats_total").increment(1);
                    tracing::debug!(beats, message = %self.config.message, "Heartbeat");
                }
                _ = ctx.cancelled() => {
                    tracing::info!(beats, "Heartbeat stopped");
                    return Ok(());
                }
            }
        }
    }
}

fn build(cfg: RunnerConfig<HeartbeatConfig>, rt: &RuntimeHandle) -> Result<Heartbeat, Infallible> {
    if let Some(routes) = rt.http() {
        routes.route("/healthz", get(|| async { "ok" }));
    }

    tracing::info!(
        interval_ms = cfg.app().interval_ms,
        log_level = ?cfg.log_level(),
        "Heartbeat configured"
    );

    Ok(Heartbeat {
        config: cfg.into_app(),
    })
}

#[tokio::main]
async fn main() {
    let code = Runner::new(build, HeartbeatConfig::default())
        .with_name(env!("CARGO_PKG_NAME"))
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_default_http_server()
        .with_metrics_handler()
        .run()
        .await;

    std::process::exit(code);
}
