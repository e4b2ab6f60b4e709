//! Per-request context handed to every handler in a chain.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → Context (request parts, body slot, pending response, chain link)
//!     → handler / middleware mutate status + headers
//!     → exactly one body write (json / text / no_content)
//!     → dispatcher takes the response and sends it
//! ```
//!
//! # Design Decisions
//! - `Context` is a cheap handle: request state lives behind one `Arc`,
//!   while each handle carries its own chain link
//! - Request parts are immutable after construction, so reads take no lock
//! - Locks are never held across an `.await`

pub mod body;
pub mod response;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::Response;
use serde::Serialize;

use crate::chain::{Link, Next};
use crate::error::{Error, Result};

pub use body::DEFAULT_BODY_LIMIT;
pub use response::Envelope;
use response::{encode_pretty, ResponseSink};

const REQUEST_ID_HEADER: &str = "x-request-id";

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    parts: Parts,
    params: Vec<(String, String)>,
    body: Mutex<Option<Body>>,
    body_limit: usize,
    response: Mutex<ResponseSink>,
}

/// Handle to the state of one in-flight request.
#[derive(Clone)]
pub struct Context {
    shared: Arc<Shared>,
    link: Link,
}

impl Context {
    /// Build a standalone context with no chain attached.
    ///
    /// `proceed()` on such a context is a no-op, which makes it suitable for
    /// calling a handler directly.
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, body, Vec::new(), DEFAULT_BODY_LIMIT, Link::detached())
    }

    pub(crate) fn from_parts(
        parts: Parts,
        body: Body,
        params: Vec<(String, String)>,
        body_limit: usize,
        link: Link,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                parts,
                params,
                body: Mutex::new(Some(body)),
                body_limit,
                response: Mutex::new(ResponseSink::default()),
            }),
            link,
        }
    }

    /// Override the body limit. Only effective before the context is cloned.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.body_limit = limit;
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.shared.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.shared.parts.uri
    }

    pub fn path(&self) -> &str {
        self.shared.parts.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.shared.parts.headers
    }

    /// A request header as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.shared.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn extensions(&self) -> &Extensions {
        &self.shared.parts.extensions
    }

    /// A path parameter captured by the route pattern, e.g. `{id}`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.shared
            .params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }

    /// Status the response will be written with.
    pub fn pending_status(&self) -> StatusCode {
        lock(&self.shared.response).status()
    }

    /// Whether the body has been written.
    pub fn is_started(&self) -> bool {
        lock(&self.shared.response).is_started()
    }

    /// Record the status for the eventual response.
    ///
    /// Fails with [`Error::ResponseStarted`] once the body is written.
    pub fn status(&self, status: StatusCode) -> Result<&Self> {
        lock(&self.shared.response).set_status(status)?;
        Ok(self)
    }

    /// Set a response header. Must happen before the body write.
    pub fn set_header(&self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::InvalidHeader(name.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.as_str().to_string()))?;
        lock(&self.shared.response).set_header(name, value)
    }

    /// Write `payload` as indented JSON with the pending status.
    pub fn json<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let mut sink = lock(&self.shared.response);
        if sink.is_started() {
            return Err(Error::ResponseStarted);
        }
        let bytes = encode_pretty(payload)?;
        sink.write(Some("application/json"), bytes)
    }

    /// Write a plain-text body with the pending status.
    pub fn text(&self, body: impl Into<String>) -> Result<()> {
        lock(&self.shared.response).write(Some("text/plain; charset=utf-8"), Bytes::from(body.into()))
    }

    /// Finish with `204 No Content` and an empty body.
    pub fn no_content(&self) -> Result<()> {
        let mut sink = lock(&self.shared.response);
        sink.set_status(StatusCode::NO_CONTENT)?;
        sink.write(None, Bytes::new())
    }

    /// Run the rest of the chain and return its outcome unchanged.
    ///
    /// A no-op returning `Ok(())` when nothing follows this handler, or
    /// when the next handler was already invoked through this context.
    pub async fn proceed(&self) -> Result<()> {
        match self.link.bind_next() {
            Next::Bound(handler, link) => {
                let next = Context {
                    shared: self.shared.clone(),
                    link,
                };
                handler.call(next).await
            }
            Next::Terminal => {
                tracing::trace!(position = self.link.position(), "End of chain");
                Ok(())
            }
            Next::Consumed => {
                tracing::warn!(
                    position = self.link.position(),
                    path = %self.path(),
                    "proceed() called again after the next handler already ran; ignoring"
                );
                Ok(())
            }
        }
    }

    /// Take the collected response, leaving a fresh sink behind.
    pub fn take_response(&self) -> Response {
        std::mem::take(&mut *lock(&self.shared.response)).into_response()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("method", self.method())
            .field("path", &self.path())
            .field("position", &self.link.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn ctx() -> Context {
        Context::new(
            Request::builder()
                .method(Method::POST)
                .uri("/items?page=2")
                .header("x-request-id", "req-1")
                .body(Body::empty())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_json_writes_status_and_content_type() {
        let ctx = ctx();
        ctx.status(StatusCode::CREATED)
            .unwrap()
            .json(&serde_json::json!({"id": 7}))
            .unwrap();

        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\n  \"id\": 7\n}\n");
    }

    #[test]
    fn test_late_status_and_header_fail_loud() {
        let ctx = ctx();
        ctx.text("done").unwrap();

        assert!(ctx.is_started());
        assert!(matches!(ctx.status(StatusCode::IM_A_TEAPOT), Err(Error::ResponseStarted)));
        assert!(matches!(ctx.set_header("x-late", "1"), Err(Error::ResponseStarted)));
        assert!(matches!(ctx.json(&1), Err(Error::ResponseStarted)));
        assert_eq!(ctx.pending_status(), StatusCode::OK);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let ctx = ctx();
        assert!(matches!(ctx.set_header("bad header", "v"), Err(Error::InvalidHeader(_))));
        assert!(matches!(ctx.set_header("x-ok", "line\nbreak"), Err(Error::InvalidHeader(_))));
    }

    #[tokio::test]
    async fn test_proceed_without_chain_is_noop() {
        let ctx = ctx();
        assert!(ctx.proceed().await.is_ok());
        assert!(!ctx.is_started());
    }

    #[test]
    fn test_request_accessors() {
        let ctx = ctx();
        assert_eq!(*ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/items");
        assert_eq!(ctx.uri().query(), Some("page=2"));
        assert_eq!(ctx.request_id(), Some("req-1"));
        assert_eq!(ctx.param("id"), None);
    }
}
