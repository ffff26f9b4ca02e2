//! Route registration for the auxiliary HTTP server.

use std::sync::{Arc, Mutex, PoisonError};

use axum::routing::MethodRouter;
use axum::Router;

/// Shared registration point handed to the application through the runtime
/// handle.
///
/// Routes may be added until the server starts; after that the router is
/// sealed and further registrations are dropped with a warning.
#[derive(Clone)]
pub struct HttpRoutes {
    router: Arc<Mutex<Option<Router>>>,
}

impl HttpRoutes {
    pub fn new() -> Self {
        Self {
            router: Arc::new(Mutex::new(Some(Router::new()))),
        }
    }

    /// Add a route. Returns `false` if the server already started.
    pub fn route(&self, path: &str, method_router: MethodRouter) -> bool {
        self.update(path, |router| router.route(path, method_router))
    }

    /// Merge a whole router. Returns `false` if the server already started.
    pub fn merge(&self, other: Router) -> bool {
        self.update("*", |router| router.merge(other))
    }

    /// Whether the routes were handed to the server.
    pub fn is_sealed(&self) -> bool {
        self.lock().is_none()
    }

    /// Take the final router. Later calls return an empty router.
    pub(crate) fn seal(&self) -> Router {
        self.lock().take().unwrap_or_default()
    }

    fn update(&self, path: &str, f: impl FnOnce(Router) -> Router) -> bool {
        let mut slot = self.lock();
        match slot.take() {
            Some(router) => {
                *slot = Some(f(router));
                true
            }
            None => {
                tracing::warn!(path, "HTTP server already started, route ignored");
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Router>> {
        self.router.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HttpRoutes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_routes_sealed_after_start() {
        let routes = HttpRoutes::new();
        assert!(routes.route("/healthz", get(|| async { "ok" })));
        assert!(!routes.is_sealed());

        let _router = routes.seal();
        assert!(routes.is_sealed());
        assert!(!routes.route("/late", get(|| async { "late" })));
    }

    #[test]
    fn test_clones_share_registrations() {
        let routes = HttpRoutes::new();
        let other = routes.clone();
        assert!(other.merge(Router::new().route("/a", get(|| async { "a" }))));
        let _router = routes.seal();
        assert!(other.is_sealed());
    }
}
