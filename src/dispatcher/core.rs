//! Dispatcher core: ensure-compiled, match, middleware, invoke.

use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::context::RequestContext;
use super::controller::ControllerResolver;
use crate::cache::RouteCache;
use crate::config::RouterConfig;
use crate::error::{ConfigError, DispatchError};
use crate::middleware::{ChainOutcome, MiddlewareChain, MiddlewareResolver};
use crate::router::{
    normalize_path, parse_method, CompiledRoutes, Handler, MatchError, ParamValue, RouteTable,
};

/// Terminal state of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran.
    Dispatched,
    /// A middleware returned `false` and answered the request itself.
    MiddlewareRejected { middleware: String },
    /// Matching or invocation failed; also recorded on the request context.
    Failed(DispatchError),
}

impl DispatchOutcome {
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched)
    }

    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        match self {
            DispatchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Single entry point for running requests against a route table.
///
/// Taking the [`RouteTable`] by value ends its build phase: nothing can be
/// registered once a dispatcher owns it. The compiled structures are built on
/// the first dispatch (or restored from the route cache) and shared read-only
/// afterwards, so one dispatcher can serve many threads.
pub struct Dispatcher {
    table: RouteTable,
    compiled: OnceCell<CompiledRoutes>,
    controllers: Arc<dyn ControllerResolver>,
    middleware: Arc<dyn MiddlewareResolver>,
    cache: Option<RouteCache>,
    base_path: String,
}

impl Dispatcher {
    pub fn new<C, M>(table: RouteTable, controllers: C, middleware: M) -> Self
    where
        C: ControllerResolver + 'static,
        M: MiddlewareResolver + 'static,
    {
        let base_path = base_path_of(table.root_url());
        Self {
            table,
            compiled: OnceCell::new(),
            controllers: Arc::new(controllers),
            middleware: Arc::new(middleware),
            cache: None,
            base_path,
        }
    }

    /// Like [`Dispatcher::new`], enabling the route cache when `config` names a file.
    pub fn with_config<C, M>(
        table: RouteTable,
        config: &RouterConfig,
        controllers: C,
        middleware: M,
    ) -> Self
    where
        C: ControllerResolver + 'static,
        M: MiddlewareResolver + 'static,
    {
        let dispatcher = Self::new(table, controllers, middleware);
        match &config.cache_file {
            Some(path) => dispatcher.enable_cache(path),
            None => dispatcher,
        }
    }

    /// Load the compiled table from `location` when possible and write it there
    /// after compiling otherwise.
    #[must_use]
    pub fn enable_cache(mut self, location: impl Into<PathBuf>) -> Self {
        self.cache = Some(RouteCache::new(location));
        self
    }

    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Compiled structures, if a dispatch already built them.
    #[must_use]
    pub fn compiled(&self) -> Option<&CompiledRoutes> {
        self.compiled.get()
    }

    /// Build (or restore) the compiled table once.
    ///
    /// Called by the first [`Dispatcher::dispatch`]; call it at startup to
    /// surface configuration errors before serving.
    pub fn ensure_compiled(&self) -> Result<&CompiledRoutes, ConfigError> {
        self.compiled.get_or_try_init(|| {
            if let Some(cache) = &self.cache {
                if let Some(mut cached) = cache.load() {
                    // Closures never reach the cache. Merge this process's by registration order.
                    let inline = self.table.build(|r| !r.handler().is_cacheable())?;
                    let cached_count = cached.len();
                    cached.absorb(inline);
                    info!(
                        cache = %cache.path().display(),
                        cached_routes = cached_count,
                        total_routes = cached.len(),
                        "Route table restored from cache"
                    );
                    return Ok(cached);
                }
            }

            let compiled = self.table.build(|_| true)?;
            if let Some(cache) = &self.cache {
                match cache.save(&compiled) {
                    Ok(written) => info!(
                        cache = %cache.path().display(),
                        cached_routes = written,
                        "Route cache written"
                    ),
                    Err(e) => warn!(error = %e, "Failed to write route cache"),
                }
            }
            Ok(compiled)
        })
    }

    /// Run one request: match, middleware, handler.
    ///
    /// Failures are returned as [`DispatchOutcome::Failed`] and recorded on
    /// `ctx` (see [`RequestContext::error`]); nothing here panics or retries.
    pub fn dispatch(&self, ctx: &mut RequestContext) -> DispatchOutcome {
        let started = Instant::now();
        ctx.path = normalize_request_path(&self.base_path, &ctx.path);

        let compiled = match self.ensure_compiled() {
            Ok(compiled) => compiled,
            Err(e) => {
                error!(error = %e, "Route table failed to compile");
                let method = ctx.method().to_string();
                return self.fail(ctx, DispatchError::NotImplemented { method });
            }
        };

        let Ok(method) = parse_method(ctx.method()) else {
            let method = ctx.method().to_string();
            return self.fail(ctx, DispatchError::NotImplemented { method });
        };

        let matched = match compiled.match_route(&method, ctx.path()) {
            Ok(m) => m,
            Err(MatchError::MethodUnregistered) => {
                return self.fail(
                    ctx,
                    DispatchError::NotImplemented {
                        method: method.to_string(),
                    },
                );
            }
            Err(MatchError::NoMatch) => {
                let path = ctx.path().to_string();
                return self.fail(
                    ctx,
                    DispatchError::NotFound {
                        method: method.to_string(),
                        path,
                    },
                );
            }
        };
        let route = Arc::clone(&matched.route);
        ctx.bind(Arc::clone(&route), matched.params);

        let passed = match MiddlewareChain::new(self.middleware.as_ref()).run(route.middleware(), ctx)
        {
            ChainOutcome::Continue(passed) => passed,
            ChainOutcome::Rejected { by } => {
                info!(
                    request_id = %ctx.request_id(),
                    route = %route.path(),
                    middleware = %by,
                    "Request stopped by middleware"
                );
                return DispatchOutcome::MiddlewareRejected { middleware: by };
            }
            ChainOutcome::Failed(e) => return self.fail(ctx, e),
        };

        match route.handler() {
            Handler::Inline(handler) => handler.call(ctx),
            Handler::Controller(target) => {
                let Some(mut controller) = self.controllers.resolve(&target.controller, ctx) else {
                    let controller = target.controller.clone();
                    return self.fail(ctx, DispatchError::BadRequest { controller });
                };
                if !controller.has_action(&target.action) {
                    return self.fail(
                        ctx,
                        DispatchError::MethodNotAllowed {
                            controller: target.controller.clone(),
                            action: target.action.clone(),
                        },
                    );
                }
                controller.call(&target.action, ctx);
            }
        }

        let latency = started.elapsed();
        for mw in passed.iter().rev() {
            mw.after(ctx, latency);
        }

        debug!(
            request_id = %ctx.request_id(),
            method = %method,
            route = %route.path(),
            latency_us = latency.as_micros() as u64,
            "Request dispatched"
        );
        DispatchOutcome::Dispatched
    }

    /// URL of a named route, resolved against the compiled index once available
    /// (which includes names restored from the cache).
    pub fn url_for(
        &self,
        name: &str,
        params: &[(&str, ParamValue)],
        query: &[(&str, &str)],
    ) -> Result<String, ConfigError> {
        match self.compiled.get() {
            Some(compiled) => compiled.url_for(self.table.root_url(), name, params, query),
            None => self.table.url_for(name, params, query),
        }
    }

    fn fail(&self, ctx: &mut RequestContext, error: DispatchError) -> DispatchOutcome {
        warn!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = error.code(),
            error = %error,
            "Dispatch failed"
        );
        ctx.set_error(error.clone());
        DispatchOutcome::Failed(error)
    }
}

/// Path component of the root URL, without a trailing slash.
fn base_path_of(root_url: &str) -> String {
    let path = match url::Url::parse(root_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => root_url.to_string(),
    };
    path.trim_end_matches('/').to_string()
}

/// Strip the base path when it prefixes `path` on a segment boundary, then
/// normalize to a single leading slash and no trailing slash.
pub(crate) fn normalize_request_path(base_path: &str, path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let stripped = match path.strip_prefix(base_path) {
        Some(rest) if !base_path.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };
    normalize_path("", stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_comes_from_root_url() {
        assert_eq!(base_path_of("http://localhost/router/Example/"), "/router/Example");
        assert_eq!(base_path_of("http://localhost"), "");
        assert_eq!(base_path_of("/app"), "/app");
        assert_eq!(base_path_of(""), "");
    }

    #[test]
    fn request_paths_are_stripped_and_normalized() {
        assert_eq!(normalize_request_path("/app", "/app/user/42/"), "/user/42");
        assert_eq!(normalize_request_path("/app", "/app"), "/");
        assert_eq!(normalize_request_path("/app", "/application"), "/application");
        assert_eq!(normalize_request_path("", "user//"), "/user");
        assert_eq!(normalize_request_path("", "/search?q=x"), "/search");
    }
}
