//! # Error Types
//!
//! Two families of failure exist and they travel differently:
//!
//! - [`ConfigError`] covers programmer mistakes made while building the route
//!   table (bad templates, duplicate or unknown route names). These are returned
//!   synchronously from registration, compilation and URL generation.
//! - [`DispatchError`] covers request-time outcomes (no route, missing controller,
//!   broken middleware). These never unwind: the dispatcher records the latest one
//!   on the request context so the caller can render a generic failure page.
//!
//! [`CacheError`] is only produced when persisting a snapshot. Reading a cache
//! never fails loudly; unreadable files are treated as a miss.

use http::StatusCode;
use thiserror::Error;

/// Route-table configuration errors, surfaced at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The path template is empty or its braces do not balance.
    #[error("invalid route pattern '{template}': {reason}")]
    InvalidPattern { template: String, reason: String },

    /// `url_for` was asked for a name nobody registered.
    #[error("no route is registered under the name '{name}'")]
    UnknownRouteName { name: String },

    /// A second route tried to claim a name that is already taken.
    #[error("route name '{name}' is already registered")]
    DuplicateRouteName { name: String },

    /// Only GET, POST, PUT, PATCH and DELETE can be routed.
    #[error("unsupported HTTP method '{method}'")]
    UnsupportedMethod { method: String },

    /// A controller target string without an action part.
    #[error("handler '{target}' must have the form Controller{separator}action")]
    InvalidHandler { target: String, separator: String },
}

/// Request-time dispatch failures.
///
/// Each variant maps onto the status code the surrounding layer should render.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No route at all is registered for this HTTP method.
    #[error("no routes registered for method {method}")]
    NotImplemented { method: String },

    /// The method has routes, but none matches the path.
    #[error("no route matches {method} {path}")]
    NotFound { method: String, path: String },

    /// The controller resolved but does not provide the requested action.
    #[error("controller '{controller}' has no action '{action}'")]
    MethodNotAllowed { controller: String, action: String },

    /// The controller identifier does not resolve to a constructible type.
    #[error("controller '{controller}' could not be resolved")]
    BadRequest { controller: String },

    /// A middleware identifier could not be resolved at all.
    #[error("middleware '{id}' is not implemented")]
    MiddlewareNotImplemented { id: String },

    /// A middleware identifier resolved to something without a `handle` entry point.
    #[error("middleware '{id}' cannot handle requests")]
    MiddlewareNotAllowed { id: String },
}

impl DispatchError {
    /// HTTP status the failure corresponds to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            DispatchError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            DispatchError::MiddlewareNotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            DispatchError::MiddlewareNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Numeric status code, as exposed through `RequestContext::error_code`.
    #[must_use]
    pub fn code(&self) -> u16 {
        self.status().as_u16()
    }
}

/// Failures while persisting the compiled route table.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("route cache I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("route cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
