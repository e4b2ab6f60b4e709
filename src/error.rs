//! Error taxonomy for handlers, middleware and the request context.
//!
//! # Design Decisions
//! - One error type flows through every link of a chain
//! - `Display` is the text that ends up in the uniform error body, so
//!   messages are written for the API client, not for the operator
//! - The response status is never carried here; handlers set it on the
//!   context before returning an error

use thiserror::Error;

/// Result alias used by handlers and context operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the request context or returned by handlers.
#[derive(Debug, Error)]
pub enum Error {
    /// Body decode attempted on an empty (or whitespace-only) stream.
    #[error("empty request body")]
    EmptyBody,

    /// Body present but not valid JSON for the requested type.
    #[error("malformed json body")]
    MalformedBody(#[source] serde_json::Error),

    /// The body stream was already read earlier in this request.
    #[error("request body already consumed")]
    BodyConsumed,

    /// The body is larger than the configured limit.
    #[error("request body too large")]
    BodyTooLarge { limit: usize },

    /// Reading the body from the connection failed.
    #[error("failed to read request body")]
    BodyRead(#[source] axum::Error),

    /// Status, headers or body touched after the response was written.
    #[error("response already started")]
    ResponseStarted,

    /// Header name or value rejected by the HTTP layer.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Serializing a response payload failed.
    #[error("failed to encode response")]
    Encode(#[source] serde_json::Error),

    /// Application-level failure; the message is passed through verbatim.
    #[error("{0}")]
    Handler(String),
}

impl Error {
    /// Build an application error carrying `message` verbatim.
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Handler(message.into())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Handler(message)
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Handler(message.to_string())
    }
}
