//! Dispatch adapter: runs a resolved chain and owns error translation.
//!
//! # Responsibilities
//! - Build a fresh `Context` for the request
//! - Run the chain from its head
//! - Convert any returned error into the uniform JSON error body
//! - Fall back to a plain-text 500 when even that write fails
//!
//! # Design Decisions
//! - This is the only place errors become responses
//! - The error body uses whatever status the failing handler left pending
//! - A failed error write means the error channel is broken; no further
//!   structured output is attempted

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::chain::{Chain, Link};
use crate::context::{Context, Envelope};
use crate::error::Error;
use crate::observability::metrics;
use crate::routing::table::{Outcome, Resolved};

const FALLBACK_MESSAGE: &str = "internal server error";

pub(crate) async fn dispatch(resolved: Resolved, request: Request<Body>, body_limit: usize) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    let (parts, body) = request.into_parts();
    let chain = Chain::new(resolved.handlers);
    let ctx = Context::from_parts(parts, body, resolved.params, body_limit, Link::head(chain));

    if let Outcome::MethodNotAllowed(allowed) = &resolved.outcome {
        let allow = allowed
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if let Err(e) = ctx.set_header("allow", &allow) {
            tracing::warn!(error = %e, "Failed to set Allow header");
        }
    }

    let response = match ctx.proceed().await {
        Ok(()) => ctx.take_response(),
        Err(err) => error_response(&ctx, err),
    };

    let status = response.status();
    tracing::debug!(
        request_id = ctx.request_id().unwrap_or("unknown"),
        method = %method,
        path = %ctx.path(),
        status = status.as_u16(),
        latency_ms = start_time.elapsed().as_millis() as u64,
        "Request handled"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start_time);

    response
}

/// Translate a chain error into the response actually sent.
pub(crate) fn error_response(ctx: &Context, err: Error) -> Response {
    tracing::debug!(
        request_id = ctx.request_id().unwrap_or("unknown"),
        path = %ctx.path(),
        status = ctx.pending_status().as_u16(),
        error = %err,
        "Handler returned error"
    );

    match ctx.json(&Envelope::failure(err.to_string())) {
        Ok(()) => ctx.take_response(),
        Err(write_err) => {
            tracing::error!(
                request_id = ctx.request_id().unwrap_or("unknown"),
                path = %ctx.path(),
                error = %err,
                write_error = %write_err,
                "Failed to write error response"
            );
            metrics::record_error_fallback();
            (StatusCode::INTERNAL_SERVER_ERROR, FALLBACK_MESSAGE).into_response()
        }
    }
}
