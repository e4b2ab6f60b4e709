//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (public registration API, shared table)
//!     → table.rs (matchit lookup, mounts, fallbacks)
//!     → matcher.rs (mount prefix match + strip)
//!     → dispatch.rs (Context, run chain, error → response)
//!
//! Router Composition (at startup):
//!     Router::new / with / group / route / mount
//!     → endpoint chains baked with scoped middleware
//!     → table frozen by convention once serving starts
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, read-only at runtime
//! - Deterministic: same input always resolves to the same chain
//! - Static routes, then mounts (longest prefix first), then parameterized
//!   routes; a mount that cannot serve the method falls back to the parent

mod dispatch;
pub mod matcher;
pub mod router;
pub(crate) mod table;

pub use router::Router;
