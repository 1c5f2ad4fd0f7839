use super::*;
use crate::error::ConfigError;
use http::Method;
use std::sync::Arc;

fn noop() -> Handler {
    Handler::inline(|_| {})
}

fn table() -> RouteTable {
    RouteTable::new("http://localhost/app")
}

#[test]
fn test_paths_are_normalized() {
    let mut t = table();
    t.get("user/{id}/", noop(), RouteOptions::new()).unwrap();
    t.get("", noop(), RouteOptions::new()).unwrap();
    t.get("///", "Home:index", RouteOptions::new()).unwrap();

    let paths: Vec<&str> = t.routes().map(Route::path).collect();
    // "///" normalizes to "/" and replaces the earlier root registration
    assert_eq!(paths, vec!["/user/{id}", "/"]);
    assert_eq!(t.len(), 2);
}

#[test]
fn test_group_prefix_applies() {
    let mut t = table();
    t.group("/admin", |g| {
        g.get("/home", "Admin:home", RouteOptions::new())?;
        Ok(())
    })
    .unwrap();
    assert_eq!(t.routes().next().map(Route::path), Some("/admin/home"));
}

#[test]
fn test_nested_groups_concatenate_outer_to_inner() {
    let mut t = table();
    t.group("/api/", |api| {
        api.group("v1", |v1| {
            v1.get("/users/{id}", "Users:show", RouteOptions::new())?;
            Ok(())
        })?;
        api.get("/status", "Status:index", RouteOptions::new())?;
        Ok(())
    })
    .unwrap();
    t.get("/outside", "Home:index", RouteOptions::new()).unwrap();

    let paths: Vec<&str> = t.routes().map(Route::path).collect();
    assert_eq!(paths, vec!["/api/v1/users/{id}", "/api/status", "/outside"]);
}

#[test]
fn test_group_root_route_is_the_prefix_itself() {
    let mut t = table();
    t.group("/produto", |g| {
        g.get("/", "Product:list", RouteOptions::new())?;
        Ok(())
    })
    .unwrap();
    assert_eq!(t.routes().next().map(Route::path), Some("/produto"));
}

#[test]
fn test_middleware_order_global_group_route() {
    let mut t = table();
    t.add_global_middleware(["session"]);
    t.group_with("/admin", &["auth"], |g| {
        g.group_with("/billing", &["audit"], |b| {
            b.get(
                "/invoices",
                "Billing:index",
                RouteOptions::new().middleware(["auth", "csrf"]),
            )?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();

    let route = t.routes().next().unwrap();
    assert_eq!(
        route.middleware(),
        &["session", "auth", "audit", "auth", "csrf"]
    );
}

#[test]
fn test_group_scope_does_not_leak_after_failure() {
    let mut t = table();
    let result = t.group_with("/admin", &["auth"], |g| {
        g.get("/ok", "Admin:ok", RouteOptions::new())?;
        g.get("/broken/{id", "Admin:broken", RouteOptions::new())?;
        Ok(())
    });
    assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));

    t.get("/after", "Home:after", RouteOptions::new()).unwrap();
    let after = t.routes().find(|r| r.path() == "/after").unwrap();
    assert!(after.middleware().is_empty());
}

#[test]
fn test_action_strings_use_separator_and_namespace() {
    let mut t = table();
    t.namespace("App\\Controllers");
    t.get("/", "HomeController:index", RouteOptions::new()).unwrap();
    t.separator("@");
    t.get("/about", "PageController@about", RouteOptions::new())
        .unwrap();

    let handlers: Vec<&ControllerRef> = t
        .routes()
        .filter_map(|r| r.handler().as_controller())
        .collect();
    assert_eq!(
        handlers[0],
        &ControllerRef::new("App\\Controllers\\HomeController", "index")
    );
    assert_eq!(handlers[1].action, "about");
}

#[test]
fn test_action_string_without_action_is_rejected() {
    let mut t = table();
    let err = t
        .get("/", "HomeController", RouteOptions::new())
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidHandler { .. }));
}

#[test]
fn test_unsupported_method_is_rejected() {
    let mut t = table();
    let err = t
        .route("OPTIONS", "/", noop(), RouteOptions::new())
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedMethod { .. }));
    assert!(t.route("patch", "/", noop(), RouteOptions::new()).is_ok());
}

#[test]
fn test_duplicate_name_is_rejected() {
    let mut t = table();
    t.get("/a", noop(), RouteOptions::named("a")).unwrap();
    let err = t.get("/b", noop(), RouteOptions::named("a")).unwrap_err();
    assert_eq!(err, ConfigError::DuplicateRouteName { name: "a".into() });
}

#[test]
fn test_static_dynamic_split() {
    let mut t = table();
    t.get("/dashboard", noop(), RouteOptions::new()).unwrap();
    t.get("/user/{id}", noop(), RouteOptions::new()).unwrap();
    t.post("/user/{id}", noop(), RouteOptions::new()).unwrap();

    let compiled = t.compile().unwrap();
    assert_eq!(compiled.static_len(), 1);
    assert_eq!(compiled.dynamic_len(), 2);
    assert!(compiled
        .static_routes(&Method::GET)
        .unwrap()
        .contains_key("/dashboard"));
    assert_eq!(compiled.dynamic_routes(&Method::POST).len(), 1);
}

#[test]
fn test_compile_fills_patterns() {
    let mut t = table();
    t.get("/user/{id}", noop(), RouteOptions::new()).unwrap();
    assert!(t.routes().next().unwrap().pattern().is_none());
    t.compile().unwrap();
    let route = t.routes().next().unwrap();
    assert_eq!(route.pattern().map(CompiledPattern::as_str), Some("^/user/([^/]+)$"));
    assert_eq!(route.param_names()[0].name(), "id");
}

#[test]
fn test_compile_is_idempotent() {
    let mut t = table();
    t.get("/a", noop(), RouteOptions::new()).unwrap();
    t.get("/b/{id}", noop(), RouteOptions::new()).unwrap();

    let first: Vec<Arc<Route>> = t.compile().unwrap().iter().cloned().collect();
    let second: Vec<Arc<Route>> = t.compile().unwrap().iter().cloned().collect();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert!(Arc::ptr_eq(a, b), "second compile must reuse the structures");
    }
}

#[test]
fn test_registration_after_compile_invalidates() {
    let mut t = table();
    t.get("/a", noop(), RouteOptions::new()).unwrap();
    t.compile().unwrap();
    assert!(t.is_compiled());

    t.get("/b", noop(), RouteOptions::new()).unwrap();
    assert!(!t.is_compiled());
    assert_eq!(t.compile().unwrap().len(), 2);
}

#[test]
fn test_static_beats_dynamic_regardless_of_order() {
    let mut t = table();
    t.get("/produto/{slug}", "Product:show", RouteOptions::new())
        .unwrap();
    t.get("/produto/nome", "Product:byName", RouteOptions::new())
        .unwrap();

    let m = t
        .compile()
        .unwrap()
        .match_route(&Method::GET, "/produto/nome")
        .unwrap();
    assert_eq!(m.route.handler().as_controller().unwrap().action, "byName");
    assert!(m.params.is_empty());
}

#[test]
fn test_first_registered_dynamic_wins() {
    let mut t = table();
    t.get("/files/{name}", "Files:first", RouteOptions::new())
        .unwrap();
    t.get("/files/{other}", "Files:second", RouteOptions::new())
        .unwrap();

    let m = t
        .compile()
        .unwrap()
        .match_route(&Method::GET, "/files/readme")
        .unwrap();
    assert_eq!(m.route.handler().as_controller().unwrap().action, "first");
    assert_eq!(m.params.get_str("name"), Some("readme"));
}

#[test]
fn test_single_and_multi_segment_extraction() {
    let mut t = table();
    t.get("/user/{id}", noop(), RouteOptions::new()).unwrap();
    t.get("/produto/{slug}/{params*}", noop(), RouteOptions::new())
        .unwrap();
    let compiled = t.compile().unwrap();

    let user = compiled.match_route(&Method::GET, "/user/42").unwrap();
    assert_eq!(user.params.get("id"), Some(&ParamValue::Single("42".into())));

    let product = compiled
        .match_route(&Method::GET, "/produto/shoes/red/large")
        .unwrap();
    assert_eq!(product.params.get_str("slug"), Some("shoes"));
    assert_eq!(
        product.params.get("params"),
        Some(&ParamValue::Multi(vec!["red".into(), "large".into()]))
    );
    assert_eq!(
        serde_json::Value::Object(product.params.to_json()),
        serde_json::json!({"slug": "shoes", "params": ["red", "large"]})
    );
}

#[test]
fn test_match_errors_distinguish_method_and_path() {
    let mut t = table();
    t.get("/user/{id}", noop(), RouteOptions::new()).unwrap();
    let compiled = t.compile().unwrap();

    assert_eq!(
        compiled.match_route(&Method::DELETE, "/user/1").unwrap_err(),
        MatchError::MethodUnregistered
    );
    assert_eq!(
        compiled.match_route(&Method::GET, "/user/1/extra").unwrap_err(),
        MatchError::NoMatch
    );
}

#[test]
fn test_url_for_named_routes() {
    let mut t = table();
    t.get("/dashboard", "Home:dashboard", RouteOptions::named("dashboard"))
        .unwrap();
    t.get(
        "/produto/{slug}/{params*}",
        "Product:index",
        RouteOptions::named("product"),
    )
    .unwrap();

    assert_eq!(
        t.url_for("dashboard", &[], &[]).unwrap(),
        "http://localhost/app/dashboard"
    );
    assert_eq!(
        t.url_for(
            "product",
            &[("slug", "shoes".into()), ("params", vec!["red", "large"].into())],
            &[("ref", "home")],
        )
        .unwrap(),
        "http://localhost/app/produto/shoes/red/large?ref=home"
    );
    assert_eq!(
        t.url_for("missing", &[], &[]).unwrap_err(),
        ConfigError::UnknownRouteName {
            name: "missing".into()
        }
    );
}

#[test]
fn test_reregistration_replaces_route_and_name() {
    let mut t = table();
    t.get("/a", noop(), RouteOptions::named("first")).unwrap();
    t.get("/b", noop(), RouteOptions::new()).unwrap();
    t.get("/a", noop(), RouteOptions::named("second")).unwrap();
    assert!(t.names().get("first").is_none());
    assert_eq!(t.names()["second"].path, "/a");

    t.get("/a", noop(), RouteOptions::new()).unwrap();
    assert!(t.names().get("second").is_none());
    let a = t.routes().find(|r| r.path() == "/a").unwrap();
    assert_eq!(a.order(), 0);
    assert_eq!(a.name(), None);
}
