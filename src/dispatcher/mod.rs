//! # Dispatcher Module
//!
//! Turns an incoming request into exactly one terminal outcome: the handler
//! ran, a middleware stopped the request, or dispatch failed with a
//! [`DispatchError`](crate::error::DispatchError).
//!
//! ## Overview
//!
//! The [`Dispatcher`] owns the finished [`RouteTable`](crate::router::RouteTable)
//! and, for every request:
//! - strips the configured base path and normalizes the request path
//! - compiles the table on first use (or restores it from the route cache)
//! - matches method and path, binding the route and its path parameters
//! - runs the route's middleware identifiers through a
//!   [`MiddlewareChain`](crate::middleware::MiddlewareChain)
//! - calls the inline handler, or resolves the controller and calls the action
//!
//! ## Request Context
//!
//! [`RequestContext`] carries the request's inputs (query, form body, JSON
//! body, headers and path parameters), the matched route and the
//! [`Response`] handlers write into. Input sources merge query, then body,
//! then JSON; a later source wins on key conflicts. A `_method` body field
//! overrides the request method.
//!
//! ## Error Mapping
//!
//! | Failure                               | Status |
//! |---------------------------------------|--------|
//! | method has no routes                  | 501    |
//! | no pattern matches the path           | 404    |
//! | controller cannot be constructed      | 400    |
//! | controller lacks the action           | 405    |
//! | middleware identifier unknown         | 501    |
//! | middleware identifier not runnable    | 405    |
//!
//! ## Example
//!
//! ```rust
//! use switchyard::dispatcher::{ActionController, ControllerRegistry, Dispatcher, RequestContext};
//! use switchyard::middleware::MiddlewareRegistry;
//! use switchyard::router::{Registrar, RouteOptions, RouteTable};
//!
//! let mut table = RouteTable::new("http://localhost");
//! table.get("/user/{id}", "UserController:show", RouteOptions::new()).unwrap();
//!
//! let mut controllers = ControllerRegistry::new();
//! controllers.register_actions(
//!     "UserController",
//!     ActionController::new().action("show", |ctx| {
//!         let id = ctx.param("id").and_then(|v| v.as_str()).unwrap_or("").to_string();
//!         ctx.response_mut().text(format!("user {id}"));
//!     }),
//! );
//!
//! let dispatcher = Dispatcher::new(table, controllers, MiddlewareRegistry::new());
//! let mut ctx = RequestContext::new("GET", "/user/42");
//! assert!(dispatcher.dispatch(&mut ctx).is_dispatched());
//! assert_eq!(ctx.response().body(), Some("user 42"));
//! ```

mod context;
mod controller;
mod core;

pub use self::context::{
    HeaderVec, RequestContext, Response, MAX_INLINE_HEADERS, METHOD_OVERRIDE_FIELD,
};
pub use self::controller::{
    ActionController, ActionFn, Controller, ControllerRegistry, ControllerResolver,
};
pub use self::core::{DispatchOutcome, Dispatcher};
