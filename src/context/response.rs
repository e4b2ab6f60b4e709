//! Response sink and the uniform JSON envelope.
//!
//! # Responsibilities
//! - Collect pending status and headers until the single body write
//! - Reject any change once the body is written
//! - Turn the collected state into an axum `Response`
//!
//! # Design Decisions
//! - The sink is write-once: the first body write fixes status and headers
//! - Late writes are reported as `Error::ResponseStarted`, never ignored

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Uniform body shape: `{"success": .., "message": .., "data": ..}`.
///
/// Failures never carry `data`; successes carry it by convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = ()> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl Envelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Pending response state for one request.
#[derive(Debug)]
pub(crate) struct ResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl ResponseSink {
    pub fn is_started(&self) -> bool {
        self.body.is_some()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<()> {
        if self.is_started() {
            return Err(Error::ResponseStarted);
        }
        self.status = status;
        Ok(())
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<()> {
        if self.is_started() {
            return Err(Error::ResponseStarted);
        }
        self.headers.insert(name, value);
        Ok(())
    }

    /// The single terminal write.
    pub fn write(&mut self, content_type: Option<&'static str>, body: Bytes) -> Result<()> {
        if self.is_started() {
            return Err(Error::ResponseStarted);
        }
        if let Some(content_type) = content_type {
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        self.body = Some(body);
        Ok(())
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body.unwrap_or_default()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// A uniform error response built outside any chain.
pub(crate) fn failure_response(status: StatusCode, message: &str) -> Response {
    let mut sink = ResponseSink {
        status,
        ..ResponseSink::default()
    };
    if let Err(e) = encode_pretty(&Envelope::failure(message))
        .and_then(|bytes| sink.write(Some("application/json"), bytes))
    {
        tracing::error!(error = %e, "Failed to encode rejection body");
    }
    sink.into_response()
}

/// Serialize with two-space indentation and a trailing newline.
pub(crate) fn encode_pretty<T: Serialize + ?Sized>(payload: &T) -> Result<Bytes> {
    let mut buf = serde_json::to_vec_pretty(payload).map_err(Error::Encode)?;
    buf.push(b'\n');
    Ok(Bytes::from(buf))
}
