//! Router composition: routes, middleware, derived routers and mounts.
//!
//! # Responsibilities
//! - Register fallible handlers per method and path
//! - Keep router-wide and scoped middleware sequences
//! - Derive routers that share the route table but branch middleware
//! - Nest routers under path prefixes
//!
//! # Design Decisions
//! - A `Router` is a value: a shared, append-only route table plus an owned
//!   list of scoped middleware that is copied on derivation
//! - Scoped middleware is baked into each endpoint chain at registration
//!   time, so deriving never changes routes registered before it
//! - Built once at startup, then only read by request tasks

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;

use crate::chain::{boxed, BoxedHandler, Handler};
use crate::routing::dispatch;
use crate::routing::matcher::PathPrefix;
use crate::routing::table::{self, Endpoint, RouteTable, SharedTable};

/// Composes fallible handlers into a dispatchable tree.
///
/// ```ignore
/// let mut router = Router::new();
/// router.use_middleware(request_log);
/// router.get("/profile", profile);
///
/// router.with(auth).route("/admin", |r| {
///     r.get("/stats", stats);
/// });
/// ```
#[derive(Clone)]
pub struct Router {
    table: SharedTable,
    scoped: Vec<BoxedHandler>,
    derived: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: RouteTable::shared(),
            scoped: Vec::new(),
            derived: false,
        }
    }

    /// Maximum number of body bytes `Context::decode` will buffer.
    pub fn with_body_limit(self, limit: usize) -> Self {
        table::write(&self.table).set_body_limit(limit);
        self
    }

    /// Register `handler` for `method` on `path`.
    ///
    /// # Panics
    /// If the pattern is malformed, conflicts with another pattern, or the
    /// method is already registered on it.
    pub fn method(&mut self, method: Method, path: &str, handler: impl Handler) -> &mut Self {
        let endpoint = self.endpoint(handler);
        table::write(&self.table).insert(method, path, endpoint);
        tracing::trace!(path, "Route registered");
        self
    }

    pub fn get(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::GET, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::POST, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::PUT, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::PATCH, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::DELETE, path, handler)
    }

    pub fn head(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::HEAD, path, handler)
    }

    pub fn options(&mut self, path: &str, handler: impl Handler) -> &mut Self {
        self.method(Method::OPTIONS, path, handler)
    }

    /// Handler run when no route matches.
    pub fn not_found(&mut self, handler: impl Handler) -> &mut Self {
        let endpoint = self.endpoint(handler);
        table::write(&self.table).set_not_found(endpoint);
        self
    }

    /// Handler run when the path matches but the method does not.
    pub fn method_not_allowed(&mut self, handler: impl Handler) -> &mut Self {
        let endpoint = self.endpoint(handler);
        table::write(&self.table).set_method_not_allowed(endpoint);
        self
    }

    /// Append middleware.
    ///
    /// On a root router it runs for every request reaching the route table,
    /// whichever route matched. On a derived router it only wraps routes
    /// registered through that router from now on.
    pub fn use_middleware(&mut self, middleware: impl Handler) -> &mut Self {
        let middleware = boxed(middleware);
        if self.derived {
            self.scoped.push(middleware);
        } else {
            table::write(&self.table).push_middleware(middleware);
        }
        self
    }

    /// Derive a router sharing this route table whose registrations pass
    /// through `middleware` first. `self` is left untouched.
    pub fn with(&self, middleware: impl Handler) -> Router {
        let mut derived = self.derive();
        derived.scoped.push(boxed(middleware));
        derived
    }

    /// Organize related registrations without adding middleware.
    pub fn group(&self, build: impl FnOnce(&mut Router)) -> Router {
        let mut group = self.derive();
        build(&mut group);
        group
    }

    /// Build a fresh child router and mount it under `prefix`.
    pub fn route(&mut self, prefix: &str, build: impl FnOnce(&mut Router)) -> Router {
        let mut child = Router::new();
        build(&mut child);
        self.mount(prefix, child.clone());
        child
    }

    /// Forward requests under `prefix` to `router`, with the prefix stripped.
    ///
    /// # Panics
    /// If a router is already mounted at the same prefix.
    pub fn mount(&mut self, prefix: &str, router: Router) -> &mut Self {
        let prefix = PathPrefix::new(prefix);
        tracing::trace!(prefix = prefix.as_str(), "Router mounted");
        table::write(&self.table).mount(prefix, self.scoped.clone(), router.table);
        self
    }

    /// Dispatch one request through the matching chain.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let (resolved, body_limit) = {
            let table = table::read(&self.table);
            (
                table.resolve(request.method(), request.uri().path()),
                table.body_limit(),
            )
        };
        dispatch::dispatch(resolved, request, body_limit).await
    }

    /// Expose the router as an axum service.
    pub fn into_axum(self) -> axum::Router {
        axum::Router::new().fallback(move |request: Request<Body>| {
            let router = self.clone();
            async move { router.handle(request).await }
        })
    }

    fn derive(&self) -> Router {
        Router {
            table: self.table.clone(),
            scoped: self.scoped.clone(),
            derived: true,
        }
    }

    fn endpoint(&self, handler: impl Handler) -> Endpoint {
        let mut chain = self.scoped.clone();
        chain.push(boxed(handler));
        Arc::from(chain)
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("scoped_middleware", &self.scoped.len())
            .field("derived", &self.derived)
            .finish()
    }
}
