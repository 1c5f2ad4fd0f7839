//! # Router Module
//!
//! Route registration, compilation and matching.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Normalizing registered paths and composing group prefixes and middleware
//! - Compiling `{name}` / `{name*}` templates into anchored regex patterns
//! - Splitting routes into an exact-lookup static map and an ordered dynamic list
//! - Matching incoming requests and extracting path parameters
//! - Generating URLs for named routes
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Build**: routes are registered on a [`RouteTable`], directly or inside
//!    scoped groups. Registration validates templates immediately.
//!
//! 2. **Compile + match**: [`RouteTable::compile`] produces [`CompiledRoutes`].
//!    A lookup first tries the static map for the method, then walks the dynamic
//!    patterns in registration order; the first hit wins.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use switchyard::router::{Registrar, RouteOptions, RouteTable};
//!
//! let mut table = RouteTable::new("http://localhost");
//! table.get("/user/{id}", "UserController:show", RouteOptions::new()).unwrap();
//! table
//!     .group("/produto", |g| {
//!         g.get("/{slug}/{params*}", "ProductController:index", RouteOptions::new())?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let compiled = table.compile().unwrap();
//! let m = compiled.match_route(&Method::GET, "/produto/shoes/red/large").unwrap();
//! assert_eq!(m.params.get_str("slug"), Some("shoes"));
//! ```

mod matcher;
mod pattern;
mod route;
mod table;
mod url;
#[cfg(test)]
mod tests;

pub use matcher::{MatchError, ParamValue, PathParams, RouteMatch, MAX_INLINE_PARAMS};
pub use pattern::{compile_pattern, is_static, validate_template, CompiledPattern, ParamName};
pub use route::{
    parse_method, ControllerRef, Handler, InlineFn, InlineHandler, Route, RouteKey, RouteOptions,
    RouteTarget, SUPPORTED_METHODS,
};
pub use table::{CompiledRoutes, Registrar, RouteGroup, RouteTable, Scope};

pub(crate) use table::normalize_path;
