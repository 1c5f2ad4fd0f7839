//! # Switchyard
//!
//! **Switchyard** is an HTTP request router: it maps an incoming method and
//! path to a registered handler, extracts path parameters, runs a middleware
//! chain and invokes the handler, which is either an inline closure or a
//! controller action.
//!
//! ## Overview
//!
//! The crate sits between an HTTP server and application code. The server
//! supplies method, path, query, body and headers through a
//! [`dispatcher::RequestContext`]; the application supplies routes, middleware
//! and a way to construct controllers. Everything in between is handled here:
//!
//! - route registration with path-prefix groups and composed middleware
//! - compilation of `{name}` / `{name*}` templates with a static/dynamic split
//! - request-time matching and parameter extraction
//! - middleware execution with short-circuit semantics
//! - named-route URL generation
//! - an optional on-disk cache of the compiled table
//!
//! ## Architecture
//!
//! - **[`router`]** - route table, groups, pattern compiler, matcher, `url_for`
//! - **[`middleware`]** - middleware trait, resolver and chain runner
//! - **[`dispatcher`]** - request context, controller resolution, dispatch state machine
//! - **[`cache`]** - persisted snapshot of the compiled route table
//! - **[`config`]** - router settings from environment variables or TOML
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`error`]** - configuration, dispatch and cache errors
//!
//! ### Request Flow
//!
//! ```text
//! RequestContext ─► Dispatcher::dispatch
//!                     ├─ ensure_compiled  (RouteCache::load, else RouteTable build + save)
//!                     ├─ match            (static map, then dynamic patterns in order)
//!                     ├─ MiddlewareChain  (global + group + route ids)
//!                     └─ invoke           (closure, or controller + action)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use switchyard::dispatcher::{ControllerRegistry, Dispatcher, RequestContext};
//! use switchyard::middleware::MiddlewareRegistry;
//! use switchyard::router::{Handler, Registrar, RouteOptions, RouteTable};
//!
//! let mut table = RouteTable::new("http://localhost");
//! table
//!     .get(
//!         "/hello/{name}",
//!         Handler::inline(|ctx| {
//!             let name = ctx.param("name").and_then(|v| v.as_str()).unwrap_or("").to_string();
//!             ctx.response_mut().text(format!("Hello, {name}!"));
//!         }),
//!         RouteOptions::named("hello"),
//!     )
//!     .unwrap();
//!
//! let dispatcher = Dispatcher::new(table, ControllerRegistry::new(), MiddlewareRegistry::new());
//! let mut ctx = RequestContext::new("GET", "/hello/world");
//! dispatcher.dispatch(&mut ctx);
//! assert_eq!(ctx.response().body(), Some("Hello, world!"));
//! assert_eq!(
//!     dispatcher.url_for("hello", &[("name", "you".into())], &[]).unwrap(),
//!     "http://localhost/hello/you"
//! );
//! ```
//!
//! ## Thread Safety
//!
//! [`router::RouteTable`] is built on one thread. Handing it to
//! [`dispatcher::Dispatcher::new`] freezes it; the dispatcher compiles it once
//! and can then be shared behind an `Arc` by any number of request threads.

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;

pub use cache::RouteCache;
pub use config::RouterConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher, RequestContext};
pub use error::{CacheError, ConfigError, DispatchError};
pub use router::{Registrar, RouteOptions, RouteTable};
