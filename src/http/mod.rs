//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum::serve, tower-http layers)
//!     → request_id.rs (assign x-request-id)
//!     → routing::Router (resolve, run chain, translate errors)
//!     → Send to client
//! ```

pub mod request_id;
pub mod server;

pub use request_id::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::HttpServer;
