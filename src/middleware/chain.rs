//! Runs a route's middleware ids in order, stopping at the first rejection.

use std::sync::Arc;
use tracing::debug;

use super::core::{Middleware, MiddlewareResolver};
use crate::dispatcher::RequestContext;
use crate::error::DispatchError;

/// How a chain run ended.
pub enum ChainOutcome {
    /// Every middleware returned `true`; carries them in execution order.
    Continue(Vec<Arc<dyn Middleware>>),
    /// `by` returned `false`. Not an error: it already answered the request.
    Rejected { by: String },
    /// An identifier could not be resolved into runnable middleware.
    Failed(DispatchError),
}

impl std::fmt::Debug for ChainOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainOutcome::Continue(passed) => write!(f, "Continue({} passed)", passed.len()),
            ChainOutcome::Rejected { by } => write!(f, "Rejected {{ by: {by:?} }}"),
            ChainOutcome::Failed(e) => write!(f, "Failed({e:?})"),
        }
    }
}

/// Runs a route's middleware identifiers in order.
///
/// Each identifier is resolved right before it runs, so everything ahead of a
/// broken identifier has already executed when the chain aborts.
pub struct MiddlewareChain<'r> {
    resolver: &'r dyn MiddlewareResolver,
}

impl<'r> MiddlewareChain<'r> {
    #[must_use]
    pub fn new(resolver: &'r dyn MiddlewareResolver) -> Self {
        Self { resolver }
    }

    pub fn run(&self, ids: &[String], ctx: &mut RequestContext) -> ChainOutcome {
        let mut passed = Vec::with_capacity(ids.len());
        for id in ids {
            let middleware = match self.resolver.resolve(id) {
                Ok(mw) => mw,
                Err(e) => return ChainOutcome::Failed(e),
            };
            if !middleware.handle(ctx) {
                debug!(middleware = %id, path = %ctx.path(), "Middleware rejected request");
                return ChainOutcome::Rejected { by: id.clone() };
            }
            passed.push(middleware);
        }
        ChainOutcome::Continue(passed)
    }
}
