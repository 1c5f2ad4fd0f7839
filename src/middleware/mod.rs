//! # Middleware Module
//!
//! Middleware are named units run between matching and the handler. A route
//! carries only identifiers (global, then group, then route-specific, duplicates
//! kept); a [`MiddlewareResolver`] turns each into a runnable [`Middleware`]
//! right before it executes.
//!
//! A middleware returning `false` stops the request without it being an error.
//! An identifier that cannot be resolved aborts the chain with a dispatch error.

mod chain;
mod core;
mod tracing;

pub use self::chain::{ChainOutcome, MiddlewareChain};
pub use self::core::{Middleware, MiddlewareRegistry, MiddlewareResolver};
pub use self::tracing::TracingMiddleware;
