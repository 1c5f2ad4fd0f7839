//! Route registration and compilation.
//!
//! [`RouteTable`] is the mutable build phase. Routes are registered directly on
//! it or through a [`RouteGroup`], a child registrar that only lives for the
//! duration of the group body, so prefixes and middleware can never leak out of
//! a group. [`RouteTable::compile`] produces the [`CompiledRoutes`] used at match
//! time: an exact-lookup map for static paths and an ordered candidate list for
//! dynamic ones.

use crate::config::RouterConfig;
use crate::error::ConfigError;
use http::Method;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use super::pattern::{compile_pattern, is_static, validate_template};
use super::route::{
    parse_method, ControllerRef, Handler, Route, RouteKey, RouteOptions, RouteTarget,
};

/// Prefix and middleware in effect while registering.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    prefix: String,
    middleware: Vec<String>,
}

impl Scope {
    /// Prefix without surrounding slashes, empty at the root.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    /// Child scope: prefixes and middleware concatenate outer-to-inner.
    fn nest(&self, prefix: &str, middleware: &[&str]) -> Scope {
        let prefix = [self.prefix.as_str(), prefix.trim_matches('/')]
            .iter()
            .filter(|p| !p.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("/");
        let mut stack = self.middleware.clone();
        stack.extend(middleware.iter().map(|m| m.to_string()));
        Scope {
            prefix,
            middleware: stack,
        }
    }
}

/// Registration surface shared by the table and its groups.
pub trait Registrar {
    /// The scope new routes are registered under.
    fn scope(&self) -> &Scope;

    /// The table routes end up in.
    fn table_mut(&mut self) -> &mut RouteTable;

    /// Register a route for `method`.
    fn route(
        &mut self,
        method: impl AsRef<str>,
        path: &str,
        target: impl Into<RouteTarget>,
        options: RouteOptions,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
    {
        let method = parse_method(method.as_ref())?;
        let scope = self.scope().clone();
        self.table_mut()
            .insert(method, path, target.into(), options, &scope)?;
        Ok(self)
    }

    fn get(
        &mut self,
        path: &str,
        target: impl Into<RouteTarget>,
        options: RouteOptions,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
    {
        self.route(Method::GET, path, target, options)
    }

    fn post(
        &mut self,
        path: &str,
        target: impl Into<RouteTarget>,
        options: RouteOptions,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
    {
        self.route(Method::POST, path, target, options)
    }

    fn put(
        &mut self,
        path: &str,
        target: impl Into<RouteTarget>,
        options: RouteOptions,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
    {
        self.route(Method::PUT, path, target, options)
    }

    fn patch(
        &mut self,
        path: &str,
        target: impl Into<RouteTarget>,
        options: RouteOptions,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
    {
        self.route(Method::PATCH, path, target, options)
    }

    fn delete(
        &mut self,
        path: &str,
        target: impl Into<RouteTarget>,
        options: RouteOptions,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
    {
        self.route(Method::DELETE, path, target, options)
    }

    /// Register the routes in `body` under `prefix`.
    fn group<F>(&mut self, prefix: &str, body: F) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), ConfigError>,
    {
        self.group_with(prefix, &[], body)
    }

    /// Register the routes in `body` under `prefix`, appending `middleware` to
    /// every one of them.
    ///
    /// The child registrar is dropped when `body` returns, whether it succeeded
    /// or not, so the outer scope is untouched either way.
    fn group_with<F>(
        &mut self,
        prefix: &str,
        middleware: &[&str],
        body: F,
    ) -> Result<&mut Self, ConfigError>
    where
        Self: Sized,
        F: FnOnce(&mut RouteGroup<'_>) -> Result<(), ConfigError>,
    {
        let scope = self.scope().nest(prefix, middleware);
        let mut group = RouteGroup {
            table: self.table_mut(),
            scope,
        };
        body(&mut group)?;
        Ok(self)
    }
}

/// Child registrar handed to a group body.
pub struct RouteGroup<'t> {
    table: &'t mut RouteTable,
    scope: Scope,
}

impl Registrar for RouteGroup<'_> {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn table_mut(&mut self) -> &mut RouteTable {
        self.table
    }
}

/// All registered routes, in registration order, plus the name index.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    positions: HashMap<RouteKey, usize>,
    names: BTreeMap<String, RouteKey>,
    global_middleware: Vec<String>,
    root: Scope,
    root_url: String,
    separator: String,
    namespace: Option<String>,
    compiled: Option<CompiledRoutes>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new("")
    }
}

impl Registrar for RouteTable {
    fn scope(&self) -> &Scope {
        &self.root
    }

    fn table_mut(&mut self) -> &mut RouteTable {
        self
    }
}

impl RouteTable {
    /// Create an empty table. `root_url` is prepended by [`RouteTable::url_for`].
    #[must_use]
    pub fn new(root_url: &str) -> Self {
        Self {
            routes: Vec::new(),
            positions: HashMap::new(),
            names: BTreeMap::new(),
            global_middleware: Vec::new(),
            root: Scope::default(),
            root_url: root_url.trim_end_matches('/').to_string(),
            separator: ":".to_string(),
            namespace: None,
            compiled: None,
        }
    }

    /// Create a table with root URL, action separator and namespace taken from `config`.
    #[must_use]
    pub fn with_config(config: &RouterConfig) -> Self {
        let mut table = Self::new(&config.root_url);
        table.separator = config.action_separator.clone();
        table.namespace = config
            .controller_namespace
            .clone()
            .filter(|ns| !ns.is_empty());
        table
    }

    /// Separator used to split `"Controller:action"` strings.
    pub fn separator(&mut self, separator: &str) -> &mut Self {
        self.separator = separator.to_string();
        self
    }

    /// Prefix every controller registered from now on with `namespace\`.
    /// An empty namespace clears it.
    pub fn namespace(&mut self, namespace: &str) -> &mut Self {
        let ns = namespace.trim_matches('\\');
        self.namespace = (!ns.is_empty()).then(|| ns.to_string());
        self
    }

    /// Middleware prepended to every route registered after this call.
    pub fn add_global_middleware<I, S>(&mut self, ids: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_middleware
            .extend(ids.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn global_middleware(&self) -> &[String] {
        &self.global_middleware
    }

    #[must_use]
    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Name index: route name to method and template.
    #[must_use]
    pub fn names(&self) -> &BTreeMap<String, RouteKey> {
        &self.names
    }

    /// `true` once [`RouteTable::compile`] has run and nothing was registered since.
    #[must_use]
    pub fn is_compiled(&self) -> bool {
        self.compiled.is_some()
    }

    fn insert(
        &mut self,
        method: Method,
        path: &str,
        target: RouteTarget,
        options: RouteOptions,
        scope: &Scope,
    ) -> Result<(), ConfigError> {
        let path = normalize_path(scope.prefix(), path);
        validate_template(&path)?;
        let handler = self.resolve_target(target)?;
        let key = RouteKey {
            method: method.clone(),
            path: path.clone(),
        };

        if let Some(name) = &options.name {
            if self.names.get(name).is_some_and(|owner| owner != &key) {
                return Err(ConfigError::DuplicateRouteName { name: name.clone() });
            }
        }

        let mut middleware = self.global_middleware.clone();
        middleware.extend(scope.middleware().iter().cloned());
        middleware.extend(options.middleware);

        let existing = self.positions.get(&key).copied();
        let route = Route {
            method,
            path,
            handler,
            name: options.name,
            middleware,
            pattern: None,
            order: existing.unwrap_or(self.routes.len()),
        };

        debug!(
            method = %route.method,
            path = %route.path,
            name = ?route.name,
            middleware = ?route.middleware,
            "Route registered"
        );

        // Re-registering a method+path replaces the earlier route in place.
        match existing {
            Some(idx) => {
                if let Some(old_name) = self.routes[idx].name.take() {
                    self.names.remove(&old_name);
                }
                if let Some(name) = &route.name {
                    self.names.insert(name.clone(), key);
                }
                self.routes[idx] = route;
            }
            None => {
                if let Some(name) = &route.name {
                    self.names.insert(name.clone(), key.clone());
                }
                self.positions.insert(key, self.routes.len());
                self.routes.push(route);
            }
        }

        self.compiled = None;
        Ok(())
    }

    fn resolve_target(&self, target: RouteTarget) -> Result<Handler, ConfigError> {
        let controller = match target {
            RouteTarget::Handler(Handler::Inline(inline)) => return Ok(Handler::Inline(inline)),
            RouteTarget::Handler(Handler::Controller(c)) => c,
            RouteTarget::Action(raw) => ControllerRef::parse(&raw, &self.separator)?,
        };
        Ok(Handler::Controller(match &self.namespace {
            Some(ns) if !controller.controller.starts_with(ns.as_str()) => ControllerRef::new(
                format!("{ns}\\{}", controller.controller),
                controller.action,
            ),
            _ => controller,
        }))
    }

    /// Build the static/dynamic lookup structures.
    ///
    /// Idempotent: once compiled, further calls return the same structures until
    /// a new registration invalidates them.
    pub fn compile(&mut self) -> Result<&CompiledRoutes, ConfigError> {
        let compiled = match self.compiled.take() {
            Some(compiled) => compiled,
            None => {
                let compiled = self.build(|_| true)?;
                for route in &mut self.routes {
                    if let Some(done) = compiled.find(&route.method, &route.path) {
                        route.pattern = done.pattern.clone();
                    }
                }
                compiled
            }
        };
        Ok(self.compiled.insert(compiled))
    }

    /// Drop compiled structures so the next [`RouteTable::compile`] rebuilds them.
    pub fn clear_compiled(&mut self) {
        self.compiled = None;
    }

    /// Compile a fresh copy of the routes accepted by `filter`, leaving the table untouched.
    pub(crate) fn build<F>(&self, filter: F) -> Result<CompiledRoutes, ConfigError>
    where
        F: Fn(&Route) -> bool,
    {
        let mut compiled = CompiledRoutes::default();
        for route in self.routes.iter().filter(|r| filter(r)) {
            let mut route = route.clone();
            if !route.is_static() && route.pattern.is_none() {
                route.pattern = Some(Arc::new(compile_pattern(&route.path)?));
            }
            compiled.push(Arc::new(route));
        }

        info!(
            routes_count = compiled.len(),
            static_count = compiled.static_len(),
            dynamic_count = compiled.dynamic_len(),
            "Route table compiled"
        );
        Ok(compiled)
    }
}

/// Trim slashes, apply the group prefix, keep exactly one leading slash and no
/// trailing slash (the root stays `/`).
pub(crate) fn normalize_path(prefix: &str, path: &str) -> String {
    let path = path.trim_matches('/');
    let joined = match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}/{path}"),
    };
    format!("/{}", joined.trim_matches('/'))
}

/// Read-only lookup structures produced by compiling a [`RouteTable`].
#[derive(Debug, Clone, Default)]
pub struct CompiledRoutes {
    pub(crate) static_routes: HashMap<Method, HashMap<String, Arc<Route>>>,
    pub(crate) dynamic_routes: HashMap<Method, Vec<Arc<Route>>>,
    pub(crate) names: BTreeMap<String, RouteKey>,
}

impl CompiledRoutes {
    /// Add a compiled route. Static iff its template holds no `{`.
    ///
    /// Dynamic candidates stay sorted by [`Route::order`]; a route with the same
    /// template replaces the earlier one in place.
    pub(crate) fn push(&mut self, route: Arc<Route>) {
        if let Some(name) = route.name() {
            self.names.insert(name.to_string(), route.key());
        }
        if route.is_static() {
            self.static_routes
                .entry(route.method.clone())
                .or_default()
                .insert(route.path.clone(), route);
        } else {
            let list = self.dynamic_routes.entry(route.method.clone()).or_default();
            match list.iter().position(|r| r.path == route.path) {
                Some(idx) => list[idx] = route,
                None => {
                    let at = list.partition_point(|r| r.order <= route.order);
                    list.insert(at, route);
                }
            }
        }
    }

    /// Merge every route of `other`, interleaving dynamic candidates by registration order.
    pub(crate) fn absorb(&mut self, other: CompiledRoutes) {
        let mut routes: Vec<Arc<Route>> = other
            .static_routes
            .into_values()
            .flat_map(HashMap::into_values)
            .collect();
        routes.extend(other.dynamic_routes.into_values().flatten());
        for route in routes {
            self.push(route);
        }
    }

    /// Exact-path map for `method`.
    #[must_use]
    pub fn static_routes(&self, method: &Method) -> Option<&HashMap<String, Arc<Route>>> {
        self.static_routes.get(method)
    }

    /// Dynamic candidates for `method`, in registration order.
    #[must_use]
    pub fn dynamic_routes(&self, method: &Method) -> &[Arc<Route>] {
        self.dynamic_routes
            .get(method)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Methods with at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        let mut methods: Vec<&Method> = self
            .static_routes
            .iter()
            .filter(|(_, m)| !m.is_empty())
            .map(|(k, _)| k)
            .chain(
                self.dynamic_routes
                    .iter()
                    .filter(|(_, v)| !v.is_empty())
                    .map(|(k, _)| k),
            )
            .collect();
        methods.sort_by_key(|m| m.as_str());
        methods.dedup();
        methods.into_iter()
    }

    /// Every route, statics first (sorted by path) then dynamics in match order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        let mut statics: Vec<&Arc<Route>> = self
            .static_routes
            .values()
            .flat_map(HashMap::values)
            .collect();
        statics.sort_by(|a, b| (a.method.as_str(), &a.path).cmp(&(b.method.as_str(), &b.path)));
        let mut methods: Vec<&Method> = self.dynamic_routes.keys().collect();
        methods.sort_by_key(|m| m.as_str());
        let dynamics = methods
            .into_iter()
            .flat_map(move |m| self.dynamic_routes(m).iter());
        statics.into_iter().chain(dynamics)
    }

    #[must_use]
    pub fn names(&self) -> &BTreeMap<String, RouteKey> {
        &self.names
    }

    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<&Arc<Route>> {
        self.static_routes
            .get(method)
            .and_then(|m| m.get(path))
            .or_else(|| self.dynamic_routes(method).iter().find(|r| r.path == path))
    }

    #[must_use]
    pub fn has_method(&self, method: &Method) -> bool {
        self.static_routes.get(method).is_some_and(|m| !m.is_empty())
            || !self.dynamic_routes(method).is_empty()
    }

    #[must_use]
    pub fn static_len(&self) -> usize {
        self.static_routes.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn dynamic_len(&self) -> usize {
        self.dynamic_routes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.static_len() + self.dynamic_len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
