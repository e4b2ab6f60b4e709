//! Fallible HTTP handlers with context-carried middleware chaining.
//!
//! Handlers and middleware share one shape, `Fn(Context) -> Future<Output =
//! Result<()>>`. Middleware continue with [`Context::proceed`]; any error that
//! surfaces from the chain is written once, by the router, as
//! `{"success": false, "message": "..."}` with the status the handler left
//! pending.
//!
//! ```ignore
//! use axum::http::StatusCode;
//! use chainline::{Context, Error, Router};
//!
//! async fn require_token(ctx: Context) -> chainline::Result<()> {
//!     if ctx.header("authorization").is_none() {
//!         ctx.status(StatusCode::UNAUTHORIZED)?;
//!         return Err(Error::msg("missing token"));
//!     }
//!     ctx.proceed().await
//! }
//!
//! let mut router = Router::new();
//! router.with(require_token).route("/admin", |r| {
//!     r.get("/stats", |ctx: Context| async move { ctx.json(&"ok") });
//! });
//! ```

pub mod chain;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use chain::Handler;
pub use config::ServerConfig;
pub use context::{Context, Envelope};
pub use error::{Error, Result};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::Router;
