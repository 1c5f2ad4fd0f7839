//! Per-request state threaded through matching, middleware and handlers.
//!
//! The surrounding HTTP layer builds a [`RequestContext`] from whatever it
//! parsed off the wire; nothing in this crate reads ambient process state.

use crate::error::DispatchError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::{ParamValue, PathParams, Route, RouteKey};
use http::StatusCode;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum inline response headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Response header storage.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Body parameter that overrides the transport method (HTML forms can only POST).
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Response being assembled for the current request.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderVec,
    body: Option<String>,
    sent: bool,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderVec::new(),
            body: None,
            sent: false,
        }
    }
}

impl Response {
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Add or replace a header (names compare case-insensitively).
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.set_header("content-type", "text/plain; charset=utf-8");
        self.finish(text.into())
    }

    pub fn html(&mut self, html: impl Into<String>) -> &mut Self {
        self.set_header("content-type", "text/html; charset=utf-8");
        self.finish(html.into())
    }

    pub fn json(&mut self, body: &Value) -> &mut Self {
        self.set_header("content-type", "application/json");
        self.finish(body.to_string())
    }

    /// `302 Found` to `location`, the usual answer of an auth middleware.
    pub fn redirect(&mut self, location: &str) -> &mut Self {
        self.set_status(StatusCode::FOUND);
        self.set_header("location", location);
        self.sent = true;
        self
    }

    /// Mark the response as produced without a body.
    pub fn send(&mut self) -> &mut Self {
        self.sent = true;
        self
    }

    fn finish(&mut self, body: String) -> &mut Self {
        self.body = Some(body);
        self.sent = true;
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// `true` once something produced the response.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.sent
    }
}

/// Everything a middleware or handler may look at for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: String,
    pub(crate) path: String,
    query: HashMap<String, String>,
    body: HashMap<String, String>,
    json: Map<String, Value>,
    headers: HashMap<String, String>,
    input: Map<String, Value>,
    params: PathParams,
    route: Option<Arc<Route>>,
    response: Response,
    error: Option<DispatchError>,
}

impl RequestContext {
    /// Start a context for `method` on `uri`. A query string on `uri` is parsed
    /// into the query parameters.
    #[must_use]
    pub fn new(method: &str, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_form(query)),
            None => (uri, HashMap::new()),
        };
        let mut ctx = Self {
            request_id: RequestId::new(),
            method: method.trim().to_ascii_uppercase(),
            path: path.to_string(),
            query,
            body: HashMap::new(),
            json: Map::new(),
            headers: HashMap::new(),
            input: Map::new(),
            params: PathParams::new(),
            route: None,
            response: Response::default(),
            error: None,
        };
        ctx.rebuild_input();
        ctx
    }

    /// Add query parameters; later values replace earlier ones.
    #[must_use]
    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self.rebuild_input();
        self
    }

    /// Add body (form) parameters. A `_method` field overrides the request method
    /// and is not kept as a parameter.
    #[must_use]
    pub fn with_body<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        if let Some(spoofed) = self.body.remove(METHOD_OVERRIDE_FIELD) {
            self.method = spoofed.trim().to_ascii_uppercase();
        }
        self.rebuild_input();
        self
    }

    /// Set the decoded JSON body. Only objects contribute parameters.
    #[must_use]
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = match json {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.rebuild_input();
        self
    }

    /// Decode a raw body according to its content type: JSON objects and
    /// urlencoded forms are understood, anything else is ignored.
    #[must_use]
    pub fn with_raw_body(self, content_type: &str, raw: &[u8]) -> Self {
        let content_type = content_type.to_ascii_lowercase();
        if content_type.contains("application/json") {
            let json = serde_json::from_slice(raw).unwrap_or(Value::Null);
            self.with_json(json)
        } else if content_type.contains("application/x-www-form-urlencoded") {
            let form: Vec<(String, String)> = url::form_urlencoded::parse(raw)
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            self.with_body(form)
        } else {
            self
        }
    }

    /// Add a header (stored lowercase). `x-request-id` also seeds the request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == REQUEST_ID_HEADER {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.insert(name, value);
        self
    }

    // Query, then body, then JSON; each later source wins on shared keys.
    fn rebuild_input(&mut self) {
        let mut input = Map::new();
        for (k, v) in self.query.iter().chain(self.body.iter()) {
            input.insert(k.clone(), Value::String(v.clone()));
        }
        for (k, v) in &self.json {
            input.insert(k.clone(), v.clone());
        }
        self.input = input;
    }

    pub(crate) fn bind(&mut self, route: Arc<Route>, params: PathParams) {
        self.route = Some(route);
        self.params = params;
    }

    pub(crate) fn set_error(&mut self, error: DispatchError) {
        self.error = Some(error);
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Effective method, upper-cased, after any `_method` override.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path; normalized against the root URL once dispatched.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> &HashMap<String, String> {
        &self.body
    }

    #[must_use]
    pub fn json(&self) -> &Map<String, Value> {
        &self.json
    }

    /// Merged query + body + JSON parameters.
    #[must_use]
    pub fn input(&self) -> &Map<String, Value> {
        &self.input
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Resolve a handler argument by name: path parameter first, then the
    /// merged input.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<Value> {
        match self.params.get(name) {
            Some(value) => serde_json::to_value(value).ok(),
            None => self.input.get(name).cloned(),
        }
    }

    /// The matched route, once matching succeeded.
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    /// Method and template of the matched route.
    #[must_use]
    pub fn current_route(&self) -> Option<RouteKey> {
        self.route.as_ref().map(|r| r.key())
    }

    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Latest dispatch failure for this request, if any.
    #[must_use]
    pub fn error(&self) -> Option<&DispatchError> {
        self.error.as_ref()
    }

    /// Status code of the latest dispatch failure.
    #[must_use]
    pub fn error_code(&self) -> Option<u16> {
        self.error.as_ref().map(DispatchError::code)
    }
}

fn parse_form(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
