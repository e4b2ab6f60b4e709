//! Chain links: the "what runs next" reference carried by each context.
//!
//! # Responsibilities
//! - Hold the ordered handlers resolved for one request
//! - Hand out the next handler to whoever holds the current link
//! - Refuse to hand out a link that was already entered
//!
//! # Design Decisions
//! - A chain is built per request, so nothing here is shared across requests
//! - Each link only knows its own position; the chain shape stays hidden
//! - A high-water mark of entered positions makes every "next" single-use:
//!   calling `proceed()` twice can never re-run downstream handlers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::chain::handler::BoxedHandler;

/// Ordered handlers for a single request traversal.
pub struct Chain {
    handlers: Vec<BoxedHandler>,
    /// Number of handlers entered so far.
    entered: AtomicUsize,
}

impl Chain {
    pub fn new(handlers: Vec<BoxedHandler>) -> Arc<Self> {
        Arc::new(Self {
            handlers,
            entered: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// How many links have been entered during this traversal.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("len", &self.handlers.len())
            .field("entered", &self.entered())
            .finish()
    }
}

/// Outcome of asking a link for its successor.
pub enum Next {
    /// The successor handler and the link it must run with.
    Bound(BoxedHandler, Link),
    /// Nothing follows this link.
    Terminal,
    /// The successor was already entered in this traversal.
    Consumed,
}

/// A position in a [`Chain`].
///
/// Position `0` is the dispatcher, before any handler has run; the handler
/// at index `i` runs holding position `i + 1`.
#[derive(Clone, Debug)]
pub struct Link {
    chain: Arc<Chain>,
    position: usize,
}

impl Link {
    /// The link held by the dispatcher before the chain starts.
    pub fn head(chain: Arc<Chain>) -> Self {
        Self { chain, position: 0 }
    }

    /// A link that has no successor; used by contexts built outside a router.
    pub fn detached() -> Self {
        Self::head(Chain::new(Vec::new()))
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Peek at the successor without consuming it.
    pub fn lookup_next(&self) -> Option<&BoxedHandler> {
        if self.chain.entered() > self.position {
            return None;
        }
        self.chain.handlers.get(self.position)
    }

    /// Claim the successor, binding it to a fresh link one step further on.
    pub fn bind_next(&self) -> Next {
        let Some(handler) = self.chain.handlers.get(self.position) else {
            return Next::Terminal;
        };

        let target = self.position + 1;
        let previous = self.chain.entered.fetch_max(target, Ordering::AcqRel);
        if previous >= target {
            return Next::Consumed;
        }

        Next::Bound(
            handler.clone(),
            Link {
                chain: self.chain.clone(),
                position: target,
            },
        )
    }
}
