//! Shared utilities for runner integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apprun::{Application, AuxServer, AuxServerError, TerminationSignal};
use async_trait::async_trait;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

/// Configuration type used across tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    pub timeout: u64,
    pub name: String,
    pub verbose: bool,
    pub db: DbConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            name: "base".into(),
            verbose: false,
            db: DbConfig {
                host: "localhost".into(),
                port: 5432,
            },
        }
    }
}

/// Ordered record of lifecycle events, shared between spies.
#[derive(Clone, Default)]
pub struct Events(Arc<Mutex<Vec<String>>>);

impl Events {
    pub fn push(&self, event: &str) {
        self.0.lock().unwrap().push(event.to_string());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// What a [`ScriptedApp`] does when run.
#[derive(Clone, Copy)]
pub enum Behavior {
    Succeed,
    Fail(&'static str),
    WaitForCancel,
    /// Fails unless the token is cancelled within the given time.
    ExpectCancelWithin(Duration),
}

pub struct ScriptedApp {
    pub behavior: Behavior,
    pub events: Events,
}

impl Application for ScriptedApp {
    type Error = io::Error;

    async fn run(self, ctx: CancellationToken) -> Result<(), Self::Error> {
        self.events.push("app:run");
        let result = match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail(message) => Err(io::Error::other(message)),
            Behavior::WaitForCancel => {
                ctx.cancelled().await;
                Ok(())
            }
            Behavior::ExpectCancelWithin(limit) => tokio::time::timeout(limit, ctx.cancelled())
                .await
                .map_err(|_| io::Error::other("cancellation not observed")),
        };
        self.events.push("app:returned");
        result
    }
}

/// Auxiliary server that only records calls.
#[derive(Clone, Default)]
pub struct SpyServer {
    pub events: Events,
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub stop_error: Option<&'static str>,
    pub stop_delay: Option<Duration>,
}

impl SpyServer {
    pub fn new(events: Events) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuxServer for SpyServer {
    fn start(&mut self, _router: Router) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.events.push("aux:start");
    }

    async fn stop(&mut self) -> Result<(), AuxServerError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.events.push("aux:stop");
        if let Some(delay) = self.stop_delay {
            tokio::time::sleep(delay).await;
        }
        match self.stop_error {
            Some(message) => Err(AuxServerError::Other(message.into())),
            None => Ok(()),
        }
    }

    fn addr(&self) -> &str {
        "spy"
    }

    fn abort(&mut self) {
        self.events.push("aux:abort");
    }
}

/// A termination source that never fires, keeping OS signals out of tests.
pub fn never() -> impl Future<Output = TerminationSignal> + Send + 'static {
    std::future::pending()
}

/// In-memory log sink.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
