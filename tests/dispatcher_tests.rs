use http::StatusCode;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use switchyard::dispatcher::{
    ControllerRegistry, DispatchOutcome, Dispatcher, RequestContext,
};
use switchyard::error::DispatchError;
use switchyard::middleware::MiddlewareRegistry;
use switchyard::router::{Handler, Registrar, RouteOptions, RouteTable};

mod common;
use common::{controller_id, storefront_dispatcher, under_root, ROOT_URL};

fn body_json(ctx: &RequestContext) -> Value {
    serde_json::from_str(ctx.response().body().unwrap_or("null")).unwrap()
}

#[test]
fn test_dispatch_controller_action_under_base_path() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("GET", &under_root("/user/42/"));

    let outcome = dispatcher.dispatch(&mut ctx);

    assert_eq!(outcome, DispatchOutcome::Dispatched);
    assert_eq!(ctx.path(), "/user/42");
    assert_eq!(body_json(&ctx), json!({ "id": "42" }));
    assert_eq!(ctx.error(), None);
    let current = ctx.current_route().unwrap();
    assert_eq!(current.path, "/user/{id}");
}

#[test]
fn test_dispatch_root_and_group_routes() {
    let dispatcher = storefront_dispatcher();

    let mut home = RequestContext::new("GET", "/router/Example");
    assert!(dispatcher.dispatch(&mut home).is_dispatched());
    assert_eq!(home.response().body(), Some("<h1>home</h1>"));
    assert_eq!(
        home.response().get_header("content-type"),
        Some("text/html; charset=utf-8")
    );

    let mut product = RequestContext::new("GET", &under_root("/produto/tenis/azul/42"));
    assert!(dispatcher.dispatch(&mut product).is_dispatched());
    assert_eq!(
        body_json(&product),
        json!({ "slug": "tenis", "params": ["azul", "42"], "path": "/produto/tenis/azul/42" })
    );

    let mut featured = RequestContext::new("GET", &under_root("/produto/nome/mateus"));
    assert!(dispatcher.dispatch(&mut featured).is_dispatched());
    assert_eq!(body_json(&featured)["featured"], "mateus");
}

#[test]
fn test_unregistered_method_is_not_implemented() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("DELETE", &under_root("/user/42"));

    let outcome = dispatcher.dispatch(&mut ctx);

    assert_eq!(
        outcome.error(),
        Some(&DispatchError::NotImplemented {
            method: "DELETE".to_string()
        })
    );
    assert_eq!(ctx.error_code(), Some(501));
}

#[test]
fn test_unknown_path_is_not_found() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("GET", &under_root("/nowhere"));

    dispatcher.dispatch(&mut ctx);

    assert_eq!(ctx.error_code(), Some(404));
    assert!(matches!(ctx.error(), Some(DispatchError::NotFound { path, .. }) if path == "/nowhere"));
}

#[test]
fn test_missing_controller_is_bad_request() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("GET", &under_root("/orphan"));

    let outcome = dispatcher.dispatch(&mut ctx);

    assert_eq!(
        outcome,
        DispatchOutcome::Failed(DispatchError::BadRequest {
            controller: controller_id("GhostController")
        })
    );
    assert_eq!(ctx.error().map(DispatchError::status), Some(StatusCode::BAD_REQUEST));
}

#[test]
fn test_missing_action_is_method_not_allowed() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("GET", &under_root("/broken"));

    dispatcher.dispatch(&mut ctx);

    assert_eq!(
        ctx.error(),
        Some(&DispatchError::MethodNotAllowed {
            controller: controller_id("HomeController"),
            action: "missing".to_string(),
        })
    );
    assert_eq!(ctx.error_code(), Some(405));
    assert!(!ctx.response().is_sent());
}

#[test]
fn test_payload_merge_order_query_body_json() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("POST", &under_root("/user?name=query&page=2"))
        .with_body([("name", "body"), ("email", "a@b.test")])
        .with_json(json!({ "email": "json@b.test", "tags": ["x"] }));

    assert!(dispatcher.dispatch(&mut ctx).is_dispatched());

    assert_eq!(
        body_json(&ctx),
        json!({
            "name": "body",
            "page": "2",
            "email": "json@b.test",
            "tags": ["x"],
        })
    );
}

#[test]
fn test_method_override_from_form_body() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("GET", &under_root("/user"))
        .with_raw_body("application/x-www-form-urlencoded", b"_method=post&name=form");

    assert_eq!(ctx.method(), "POST");
    assert!(dispatcher.dispatch(&mut ctx).is_dispatched());
    assert_eq!(body_json(&ctx), json!({ "name": "form" }));
}

#[test]
fn test_unsupported_transport_method_is_not_implemented() {
    let dispatcher = storefront_dispatcher();
    let mut ctx = RequestContext::new("OPTIONS", &under_root("/"));

    dispatcher.dispatch(&mut ctx);

    assert_eq!(ctx.error_code(), Some(501));
}

#[test]
fn test_inline_handler_receives_path_parameters() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let mut table = RouteTable::new("");
    table
        .get(
            "/hello/{name}",
            Handler::inline(move |ctx| {
                seen.fetch_add(1, Ordering::SeqCst);
                let name = ctx.arg("name").unwrap_or_default();
                ctx.response_mut().text(format!("hello {}", name.as_str().unwrap_or("")));
            }),
            RouteOptions::new(),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(table, ControllerRegistry::new(), MiddlewareRegistry::new());

    let mut ctx = RequestContext::new("get", "/hello/ana");
    assert!(dispatcher.dispatch(&mut ctx).is_dispatched());
    assert_eq!(ctx.response().body(), Some("hello ana"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_compiles_once_and_is_shared_between_threads() {
    let dispatcher = Arc::new(storefront_dispatcher());
    assert!(dispatcher.compiled().is_none());
    dispatcher.ensure_compiled().unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                let mut ctx = RequestContext::new("GET", &under_root(&format!("/user/{i}")));
                dispatcher.dispatch(&mut ctx);
                body_json(&ctx)["id"].as_str().map(str::to_string)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(i.to_string()));
    }
    assert_eq!(dispatcher.compiled().map(|c| c.len()), Some(8));
}

#[test]
fn test_dispatcher_url_for_uses_root_url() {
    let dispatcher = storefront_dispatcher();
    assert_eq!(
        dispatcher
            .url_for("dashboard", &[], &[("tab", "orders")])
            .unwrap(),
        format!("{ROOT_URL}/dashboard?tab=orders")
    );
    dispatcher.ensure_compiled().unwrap();
    assert_eq!(
        dispatcher.url_for("user.show", &[("id", "9".into())], &[]).unwrap(),
        format!("{ROOT_URL}/user/9")
    );
}

#[test]
fn test_request_id_header_is_propagated() {
    let dispatcher = storefront_dispatcher();
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let mut ctx = RequestContext::new("GET", &under_root("/")).with_header("X-Request-Id", id);

    dispatcher.dispatch(&mut ctx);

    assert_eq!(ctx.request_id().to_string(), id);
    assert_eq!(ctx.header("x-request-id"), Some(id));
}
