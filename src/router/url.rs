//! Named-route URL generation.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use super::matcher::ParamValue;
use super::route::RouteKey;
use super::table::{CompiledRoutes, RouteTable};

#[allow(clippy::expect_used)]
static LEFTOVER_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("placeholder regex is valid"));

#[allow(clippy::expect_used)]
static REPEATED_SLASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/{2,}").expect("slash regex is valid"));

impl RouteTable {
    /// Build the URL of the route registered as `name`.
    ///
    /// Placeholders are filled from `params`; placeholders left without a value
    /// are removed. `query` and any params matching no placeholder are
    /// form-encoded and appended, in that order.
    ///
    /// ```
    /// use switchyard::router::{Registrar, RouteOptions, RouteTable};
    ///
    /// let mut table = RouteTable::new("https://shop.test/app");
    /// table.get("/user/{id}", "Users:show", RouteOptions::named("user")).unwrap();
    /// let url = table.url_for("user", &[("id", 42_i64.into())], &[("tab", "orders")]).unwrap();
    /// assert_eq!(url, "https://shop.test/app/user/42?tab=orders");
    /// ```
    pub fn url_for(
        &self,
        name: &str,
        params: &[(&str, ParamValue)],
        query: &[(&str, &str)],
    ) -> Result<String, ConfigError> {
        url_for_in(self.names(), self.root_url(), name, params, query)
    }
}

impl CompiledRoutes {
    /// Same as [`RouteTable::url_for`], against a compiled (possibly cache-restored) index.
    pub fn url_for(
        &self,
        root_url: &str,
        name: &str,
        params: &[(&str, ParamValue)],
        query: &[(&str, &str)],
    ) -> Result<String, ConfigError> {
        url_for_in(self.names(), root_url.trim_end_matches('/'), name, params, query)
    }
}

fn url_for_in(
    names: &BTreeMap<String, RouteKey>,
    root_url: &str,
    name: &str,
    params: &[(&str, ParamValue)],
    query: &[(&str, &str)],
) -> Result<String, ConfigError> {
    let key = names
        .get(name)
        .ok_or_else(|| ConfigError::UnknownRouteName {
            name: name.to_string(),
        })?;
    Ok(build_url(root_url, &key.path, params, query))
}

/// Fill `template` and prefix it with `root_url`.
pub(crate) fn build_url(
    root_url: &str,
    template: &str,
    params: &[(&str, ParamValue)],
    query: &[(&str, &str)],
) -> String {
    let mut path = template.to_string();
    let mut leftover: Vec<(&str, String)> = Vec::new();

    for (key, value) in params {
        let rendered = match value {
            ParamValue::Single(s) => s.clone(),
            ParamValue::Multi(segments) => segments.join("/"),
            ParamValue::Null => continue,
        };
        let multi = format!("{{{key}*}}");
        let single = format!("{{{key}}}");
        if !path.contains(&multi) && !path.contains(&single) {
            debug!(template = %template, param = %key, "Parameter moved to query string");
            leftover.push((*key, rendered));
            continue;
        }
        path = path.replace(&multi, &rendered).replace(&single, &rendered);
    }

    let path = LEFTOVER_PLACEHOLDER.replace_all(&path, "");
    let path = REPEATED_SLASH.replace_all(&path, "/");
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let mut url = format!("{root_url}{path}");
    if !query.is_empty() || !leftover.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query)
            .extend_pairs(leftover.iter().map(|(k, v)| (*k, v.as_str())))
            .finish();
        url.push('?');
        url.push_str(&encoded);
    }
    url
}
