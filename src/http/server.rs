//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the router in the ambient tower layers (tracing, timeout, request ID)
//! - Keep layer rejections on the uniform `{"success": false, ..}` body
//! - Bind the service to a listener
//! - Drain in-flight requests on shutdown, with a deadline
//!
//! # Design Decisions
//! - No tower body limit layer: `Context::decode` enforces the configured
//!   limit, so sized and chunked bodies fail the same way

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use axum::middleware::map_response;
use axum::response::Response;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::context::response::failure_response;
use crate::http::request_id::MakeRequestUuidV4;
use crate::routing::Router;

/// HTTP server for a [`Router`].
pub struct HttpServer {
    app: axum::Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let router = router.with_body_limit(config.limits.body_limit_bytes);
        let app = Self::build_app(&config, router);
        Self { app, config }
    }

    /// Build the axum service with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, router: Router) -> axum::Router {
        router
            .into_axum()
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(map_response(uniform_rejection))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// The fully layered service, for driving requests in-process.
    pub fn app(&self) -> axum::Router {
        self.app.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until `shutdown` fires, then drain for at most the grace period.
    ///
    /// Dropping every [`Shutdown`](crate::Shutdown) sender also stops the
    /// server; that case is logged at `warn`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let signalled = Arc::new(Notify::new());

        let notify = signalled.clone();
        let mut serve = Box::pin(
            axum::serve(listener, self.app)
                .with_graceful_shutdown(async move {
                    match shutdown.recv().await {
                        Err(broadcast::error::RecvError::Closed) => tracing::warn!(
                            "Shutdown handle dropped without trigger, draining connections"
                        ),
                        _ => tracing::info!("Shutdown signal received, draining connections"),
                    }
                    notify.notify_one();
                })
                .into_future(),
        );

        tokio::select! {
            result = &mut serve => result?,
            _ = async {
                signalled.notified().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Graceful shutdown timed out, forcing exit"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Rewrite the bare 408 from `TimeoutLayer` into the uniform error body.
async fn uniform_rejection(response: Response) -> Response {
    if response.status() != StatusCode::REQUEST_TIMEOUT
        || response.headers().contains_key(header::CONTENT_TYPE)
    {
        return response;
    }
    failure_response(StatusCode::REQUEST_TIMEOUT, "request timed out")
}
