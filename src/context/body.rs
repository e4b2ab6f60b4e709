//! Request body decoding.
//!
//! The body stream can be read exactly once per request. An empty body and
//! a body that is not valid JSON are reported as different errors, and both
//! leave a 400 pending on the context. A body over the limit leaves a 413.

use axum::body::Body;
use axum::http::{header, StatusCode};
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;

use crate::context::{lock, Context};
use crate::error::{Error, Result};

/// Default cap on how much of a body `decode` will buffer.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

impl Context {
    /// Parse the request body as JSON into `T`.
    ///
    /// Fails with [`Error::EmptyBody`] when there is nothing but whitespace,
    /// [`Error::MalformedBody`] when parsing fails,
    /// [`Error::BodyTooLarge`] past the body limit, and
    /// [`Error::BodyConsumed`] on every call after the first.
    pub async fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.take_body()?;
        let bytes = self.read_limited(body).await?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            self.reject_body(StatusCode::BAD_REQUEST);
            return Err(Error::EmptyBody);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!(error = %e, path = %self.path(), "Rejected request body");
            self.reject_body(StatusCode::BAD_REQUEST);
            Error::MalformedBody(e)
        })
    }

    /// Buffer the body, whether it is sized or chunked, up to the limit.
    async fn read_limited(&self, body: Body) -> Result<Vec<u8>> {
        let limit = self.shared.body_limit;

        let declared = self
            .header(header::CONTENT_LENGTH.as_str())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len > limit) {
            return Err(self.too_large(limit));
        }

        let mut stream = body.into_data_stream();
        let mut buf = Vec::with_capacity(declared.unwrap_or(0));
        loop {
            let chunk = match stream.try_next().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    self.reject_body(StatusCode::BAD_REQUEST);
                    return Err(Error::BodyRead(e));
                }
            };
            if buf.len() + chunk.len() > limit {
                return Err(self.too_large(limit));
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    fn too_large(&self, limit: usize) -> Error {
        tracing::debug!(limit, path = %self.path(), "Request body over limit");
        self.reject_body(StatusCode::PAYLOAD_TOO_LARGE);
        Error::BodyTooLarge { limit }
    }

    fn take_body(&self) -> Result<Body> {
        lock(&self.shared.body).take().ok_or(Error::BodyConsumed)
    }

    fn reject_body(&self, status: StatusCode) {
        // Once started the response already has a status; nothing to do.
        let _ = lock(&self.shared.response).set_status(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        name: String,
        age: u32,
    }

    fn ctx_with_body(body: &'static str) -> Context {
        Context::new(Request::builder().uri("/profile").body(Body::from(body)).unwrap())
    }

    #[tokio::test]
    async fn test_decode_valid_body_once() {
        let ctx = ctx_with_body(r#"{"name": "Ada", "age": 36}"#);

        let profile: Profile = ctx.decode().await.unwrap();
        assert_eq!(profile, Profile { name: "Ada".into(), age: 36 });
        assert_eq!(ctx.pending_status(), StatusCode::OK);

        let again = ctx.decode::<Profile>().await;
        assert!(matches!(again, Err(Error::BodyConsumed)));
    }

    #[tokio::test]
    async fn test_decode_empty_body() {
        let ctx = ctx_with_body("  \n");
        let result = ctx.decode::<Profile>().await;

        assert!(matches!(result, Err(Error::EmptyBody)));
        assert_eq!(ctx.pending_status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_decode_malformed_body() {
        let ctx = ctx_with_body(r#"{"name": "Ada""#);
        let result = ctx.decode::<Profile>().await;

        assert!(matches!(result, Err(Error::MalformedBody(_))));
        assert_eq!(ctx.pending_status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_decode_respects_body_limit() {
        let ctx = ctx_with_body(r#"{"name": "a very long name indeed", "age": 1}"#).with_body_limit(8);
        let result = ctx.decode::<Profile>().await;

        assert!(matches!(result, Err(Error::BodyTooLarge { limit: 8 })));
        assert_eq!(ctx.pending_status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_chunked_body_over_limit_matches_sized() {
        let chunks = vec![
            Ok::<_, std::io::Error>(axum::body::Bytes::from_static(b"{\"name\": ")),
            Ok(axum::body::Bytes::from_static(b"\"a very long name\", \"age\": 1}")),
        ];
        let request = Request::builder()
            .uri("/profile")
            .body(Body::from_stream(futures_util::stream::iter(chunks)))
            .unwrap();
        let ctx = Context::new(request).with_body_limit(16);

        let result = ctx.decode::<Profile>().await;
        assert!(matches!(result, Err(Error::BodyTooLarge { limit: 16 })));
        assert_eq!(ctx.pending_status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_rejected_before_read() {
        let request = Request::builder()
            .uri("/profile")
            .header("content-length", "4096")
            .body(Body::from("{}"))
            .unwrap();
        let ctx = Context::new(request).with_body_limit(64);

        let result = ctx.decode::<serde_json::Value>().await;
        assert!(matches!(result, Err(Error::BodyTooLarge { limit: 64 })));
    }
}
