//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl+C (or a test) → Shutdown::trigger
//!     → broadcast to every subscriber
//!     → HttpServer stops accepting, drains, exits
//! ```
//!
//! # Design Decisions
//! - Shutdown has timeout: forced exit after the configured grace period
//! - Signal wiring lives in the binary; the library only coordinates

pub mod shutdown;

pub use shutdown::Shutdown;
