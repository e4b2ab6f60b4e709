//! Server configuration.
//!
//! # Data Flow
//! ```text
//! chainline.toml
//!     → loader.rs (read + toml deserialize)
//!     → validation.rs (addresses, non-zero limits)
//!     → ServerConfig
//!     → HttpServer / logging::init / metrics exporter
//! ```
//!
//! Every field is defaulted, so an empty file (or no file) is a working
//! setup. Routes are not configured here; they are code.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{LimitsConfig, ListenerConfig, ObservabilityConfig, ServerConfig, TimeoutConfig};
pub use validation::ValidationError;
