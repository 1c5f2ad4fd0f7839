//! Route definitions: methods, handlers and per-route options.

use crate::dispatcher::RequestContext;
use crate::error::ConfigError;
use http::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::pattern::{CompiledPattern, ParamName};

/// Methods a route can be registered for.
pub const SUPPORTED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

/// Parse a method name case-insensitively, rejecting anything not routable.
pub fn parse_method(method: &str) -> Result<Method, ConfigError> {
    let upper = method.trim().to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or_else(|| ConfigError::UnsupportedMethod {
            method: method.to_string(),
        })
}

/// Signature of an inline (closure) handler.
pub type InlineFn = dyn Fn(&mut RequestContext) + Send + Sync;

/// A closure handler. Closures cannot be persisted, so routes using them are
/// never written to the route cache.
#[derive(Clone)]
pub struct InlineHandler(Arc<InlineFn>);

impl InlineHandler {
    pub fn call(&self, ctx: &mut RequestContext) {
        (self.0)(ctx)
    }
}

impl fmt::Debug for InlineHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InlineHandler(<closure>)")
    }
}

/// A controller identifier plus the action to invoke on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerRef {
    pub controller: String,
    pub action: String,
}

impl ControllerRef {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }

    /// Split `"HomeController:index"` on `separator`.
    pub fn parse(target: &str, separator: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidHandler {
            target: target.to_string(),
            separator: separator.to_string(),
        };
        if separator.is_empty() {
            return Err(invalid());
        }
        let (controller, action) = target.split_once(separator).ok_or_else(invalid)?;
        let (controller, action) = (controller.trim(), action.trim());
        if controller.is_empty() || action.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(controller, action))
    }
}

/// What a route runs once matched.
#[derive(Debug, Clone)]
pub enum Handler {
    Inline(InlineHandler),
    Controller(ControllerRef),
}

impl Handler {
    /// Wrap a closure as a handler.
    pub fn inline<F>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        Handler::Inline(InlineHandler(Arc::new(f)))
    }

    pub fn controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Handler::Controller(ControllerRef::new(controller, action))
    }

    /// Only controller references survive a round trip through the cache.
    #[must_use]
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Handler::Controller(_))
    }

    #[must_use]
    pub fn as_controller(&self) -> Option<&ControllerRef> {
        match self {
            Handler::Controller(c) => Some(c),
            Handler::Inline(_) => None,
        }
    }
}

/// Anything that can be handed to a registrar as a route target.
///
/// Strings are controller action strings (`"Controller:action"`) and get parsed
/// with the table's separator and namespace at registration time.
#[derive(Debug, Clone)]
pub enum RouteTarget {
    Handler(Handler),
    Action(String),
}

impl From<Handler> for RouteTarget {
    fn from(h: Handler) -> Self {
        RouteTarget::Handler(h)
    }
}

impl From<ControllerRef> for RouteTarget {
    fn from(c: ControllerRef) -> Self {
        RouteTarget::Handler(Handler::Controller(c))
    }
}

impl From<&str> for RouteTarget {
    fn from(s: &str) -> Self {
        RouteTarget::Action(s.to_string())
    }
}

impl From<String> for RouteTarget {
    fn from(s: String) -> Self {
        RouteTarget::Action(s)
    }
}

/// Optional per-route settings.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub(crate) name: Option<String>,
    pub(crate) middleware: Vec<String>,
}

impl RouteOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `RouteOptions::new().name(name)`.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Route-specific middleware, run after global and group middleware.
    #[must_use]
    pub fn middleware<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware.extend(ids.into_iter().map(Into::into));
        self
    }
}

/// Identity of a route: method plus normalized path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    #[serde(with = "method_serde")]
    pub method: Method,
    pub path: String,
}

/// One registration: method + path + handler + middleware.
#[derive(Debug, Clone)]
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) handler: Handler,
    pub(crate) name: Option<String>,
    pub(crate) middleware: Vec<String>,
    pub(crate) pattern: Option<Arc<CompiledPattern>>,
    pub(crate) order: usize,
}

impl Route {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Normalized template, e.g. `/user/{id}`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Position in registration order. Dynamic candidates are tried by ascending order.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Effective chain: global, then group, then route-specific.
    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    /// `None` until the table has been compiled, and always `None` for static routes.
    #[must_use]
    pub fn pattern(&self) -> Option<&CompiledPattern> {
        self.pattern.as_deref()
    }

    #[must_use]
    pub fn param_names(&self) -> &[ParamName] {
        self.pattern().map(CompiledPattern::params).unwrap_or(&[])
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        super::pattern::is_static(&self.path)
    }

    #[must_use]
    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.clone(),
            path: self.path.clone(),
        }
    }
}

/// `http::Method` carries no serde impls; persist it as its canonical string.
pub(crate) mod method_serde {
    use http::Method;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(method: &Method, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(method.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Method, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_method(&raw).map_err(serde::de::Error::custom)
    }
}
