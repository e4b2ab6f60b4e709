//! Handler chaining subsystem.
//!
//! # Data Flow
//! ```text
//! Router resolves method + path
//!     → Chain [router mw.., scoped mw.., endpoint]
//!     → Link::head (dispatcher)
//!     → ctx.proceed() binds the next Link and runs its handler
//!     → error or Ok bubbles back up the call stack
//! ```
//!
//! # Design Decisions
//! - Middleware and endpoints share one `Handler` type
//! - The chain is an explicit list with a per-context cursor, not a
//!   key-addressed ambient store
//! - Post-processing after `proceed()` unwinds in reverse registration order
//!   purely through the call stack

pub mod handler;
pub mod link;

pub use handler::{boxed, BoxFuture, BoxedHandler, Handler};
pub use link::{Chain, Link, Next};
