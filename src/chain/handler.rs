//! The fallible handler abstraction.
//!
//! Endpoints and middleware are the same thing: a function of a
//! [`Context`] that finishes with `Ok(())` or an [`Error`]. Any
//! `async` closure or `async fn` taking a `Context` qualifies.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased handler shared by every request that reaches it.
pub type BoxedHandler = Arc<dyn Handler>;

/// A unit of request logic that either succeeds or fails with an error.
///
/// Middleware continue the chain with [`Context::proceed`]; returning
/// without calling it short-circuits everything downstream.
pub trait Handler: Send + Sync + 'static {
    /// Run the handler against the given context.
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<(), Error>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<(), Error>> {
        Box::pin(self(ctx))
    }
}

/// Erase a handler so it can be stored next to handlers of other types.
pub fn boxed<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}
