//! The `Middleware` trait and the registry that resolves middleware by id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::dispatcher::RequestContext;
use crate::error::DispatchError;

/// A unit run before the handler that may stop the request.
pub trait Middleware: Send + Sync {
    /// `true` continues to the next middleware or the handler. `false` stops the
    /// request; the middleware is expected to have produced the response itself.
    fn handle(&self, ctx: &mut RequestContext) -> bool;

    /// Called in reverse order after the handler ran, for middleware that passed.
    fn after(&self, _ctx: &RequestContext, _latency: Duration) {}
}

impl<F> Middleware for F
where
    F: Fn(&mut RequestContext) -> bool + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext) -> bool {
        self(ctx)
    }
}

/// Turns middleware identifiers into runnable middleware.
pub trait MiddlewareResolver: Send + Sync {
    /// Resolve `id`, failing with [`DispatchError::MiddlewareNotImplemented`] when
    /// nothing is known by that name and [`DispatchError::MiddlewareNotAllowed`]
    /// when the name is known but cannot handle requests.
    fn resolve(&self, id: &str) -> Result<Arc<dyn Middleware>, DispatchError>;
}

#[derive(Clone)]
enum Entry {
    Handler(Arc<dyn Middleware>),
    Inert,
}

/// Map-backed [`MiddlewareResolver`].
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Entry>,
}

impl MiddlewareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M>(&mut self, id: &str, middleware: M) -> &mut Self
    where
        M: Middleware + 'static,
    {
        self.entries
            .insert(id.to_string(), Entry::Handler(Arc::new(middleware)));
        self
    }

    pub fn register_shared(&mut self, id: &str, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.entries.insert(id.to_string(), Entry::Handler(middleware));
        self
    }

    /// Record `id` as a known component that has no `handle` entry point.
    /// Routes naming it fail with `MiddlewareNotAllowed`.
    pub fn declare(&mut self, id: &str) -> &mut Self {
        self.entries.insert(id.to_string(), Entry::Inert);
        self
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.entries.keys().collect();
        ids.sort();
        f.debug_struct("MiddlewareRegistry")
            .field("middleware", &ids)
            .finish()
    }
}

impl MiddlewareResolver for MiddlewareRegistry {
    fn resolve(&self, id: &str) -> Result<Arc<dyn Middleware>, DispatchError> {
        match self.entries.get(id) {
            Some(Entry::Handler(mw)) => Ok(Arc::clone(mw)),
            Some(Entry::Inert) => Err(DispatchError::MiddlewareNotAllowed { id: id.to_string() }),
            None => Err(DispatchError::MiddlewareNotImplemented { id: id.to_string() }),
        }
    }
}
