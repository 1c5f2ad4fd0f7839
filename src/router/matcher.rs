//! Request-time matching and parameter extraction.
//!
//! Static routes are an exact hash lookup and always win. Only when that misses
//! are the dynamic patterns for the method tried, first-registered first.

use http::Method;
use serde::Serialize;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

use super::route::Route;
use super::table::CompiledRoutes;

/// Maximum number of path parameters stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// A captured parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// `{name}`: one segment.
    Single(String),
    /// `{name*}`: the remaining segments, split on `/`.
    Multi(Vec<String>),
    /// The capture group did not participate in the match.
    Null,
}

impl ParamValue {
    /// Single value, or `None` for multi-segment and absent captures.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Single(s) => Some(s),
            _ => None,
        }
    }

    /// Segments of a multi-segment capture.
    #[must_use]
    pub fn as_segments(&self) -> Option<&[String]> {
        match self {
            ParamValue::Multi(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Single(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Single(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Multi(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        ParamValue::Multi(v.into_iter().map(str::to_string).collect())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Single(n.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        ParamValue::Single(n.to_string())
    }
}

/// Path parameters in placeholder order. Names carry no trailing `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(SmallVec<[(Arc<str>, ParamValue); MAX_INLINE_PARAMS]>);

impl PathParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str, value: ParamValue) {
        self.0.push((Arc::from(name), value));
    }

    /// Last value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// JSON object view, for handing to handlers that want a map.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.0
            .iter()
            .map(|(k, v)| {
                let value = serde_json::to_value(v).unwrap_or(serde_json::Value::Null);
                (k.to_string(), value)
            })
            .collect()
    }
}

/// A successful match.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: PathParams,
}

/// Why nothing matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    /// No route of any kind is registered for the method.
    MethodUnregistered,
    /// The method has routes, none of which fits the path.
    NoMatch,
}

impl CompiledRoutes {
    /// Find the route for `method` + `path`.
    ///
    /// `path` must already be normalized (leading slash, no trailing slash).
    pub fn match_route(&self, method: &Method, path: &str) -> Result<RouteMatch, MatchError> {
        if !self.has_method(method) {
            return Err(MatchError::MethodUnregistered);
        }

        if let Some(route) = self.static_routes(method).and_then(|m| m.get(path)) {
            debug!(method = %method, path = %path, route = %route.path(), "Static route matched");
            return Ok(RouteMatch {
                route: Arc::clone(route),
                params: PathParams::new(),
            });
        }

        for route in self.dynamic_routes(method) {
            let Some(pattern) = route.pattern() else {
                continue;
            };
            let Some(captures) = pattern.regex().captures(path) else {
                continue;
            };

            let mut params = PathParams::new();
            for (i, param) in pattern.params().iter().enumerate() {
                let value = match captures.get(i + 1) {
                    Some(m) if param.is_multi() => {
                        ParamValue::Multi(m.as_str().split('/').map(str::to_string).collect())
                    }
                    Some(m) => ParamValue::Single(m.as_str().to_string()),
                    None => ParamValue::Null,
                };
                params.push(param.name(), value);
            }

            debug!(
                method = %method,
                path = %path,
                route = %route.path(),
                path_params = ?params,
                "Dynamic route matched"
            );
            return Ok(RouteMatch {
                route: Arc::clone(route),
                params,
            });
        }

        debug!(method = %method, path = %path, "No route matched");
        Err(MatchError::NoMatch)
    }
}
