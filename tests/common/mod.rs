#![allow(dead_code)]

use serde_json::json;
use switchyard::dispatcher::{
    ActionController, Controller, ControllerRegistry, Dispatcher, RequestContext,
};
use switchyard::middleware::MiddlewareRegistry;
use switchyard::router::{Registrar, RouteOptions, RouteTable};

pub const ROOT_URL: &str = "http://localhost/router/Example";
pub const NAMESPACE: &str = "Example\\Http\\Controllers";

pub fn controller_id(name: &str) -> String {
    format!("{NAMESPACE}\\{name}")
}

/// Small storefront: home page, users, a guarded dashboard and a product group.
pub fn storefront_table() -> RouteTable {
    let mut table = RouteTable::new(ROOT_URL);
    table.namespace(NAMESPACE);

    table
        .get("/", "HomeController:index", RouteOptions::named("home"))
        .unwrap()
        .get("/user/{id}", "HomeController:user", RouteOptions::named("user.show"))
        .unwrap()
        .post("/user", "HomeController:store", RouteOptions::named("user.store"))
        .unwrap()
        .get(
            "/dashboard",
            "HomeController:dashboard",
            RouteOptions::named("dashboard").middleware(["auth"]),
        )
        .unwrap()
        .get("/broken", "HomeController:missing", RouteOptions::new())
        .unwrap()
        .get("/orphan", "GhostController:index", RouteOptions::new())
        .unwrap();

    table
        .group("/produto", |g| {
            g.get("/nome/mateus", "ProductController:featured", RouteOptions::new())?;
            g.get(
                "/{slug}/{params*}",
                "ProductController:show",
                RouteOptions::named("product.show"),
            )?;
            Ok(())
        })
        .unwrap();

    table
}

fn home_controller() -> ActionController {
    ActionController::new()
        .action("index", |ctx| {
            ctx.response_mut().html("<h1>home</h1>");
        })
        .action("user", |ctx| {
            let id = ctx.arg("id").unwrap_or_default();
            ctx.response_mut().json(&json!({ "id": id }));
        })
        .action("store", |ctx| {
            let input = serde_json::Value::Object(ctx.input().clone());
            ctx.response_mut().json(&input);
        })
        .action("dashboard", |ctx| {
            ctx.response_mut().text("dashboard");
        })
}

/// Controller built per request, remembering which request created it.
pub struct ProductController {
    request_path: String,
}

impl Controller for ProductController {
    fn has_action(&self, action: &str) -> bool {
        matches!(action, "show" | "featured")
    }

    fn call(&mut self, action: &str, ctx: &mut RequestContext) {
        let body = match action {
            "featured" => json!({ "featured": "mateus", "path": self.request_path }),
            _ => json!({
                "slug": ctx.arg("slug"),
                "params": ctx.arg("params"),
                "path": self.request_path,
            }),
        };
        ctx.response_mut().json(&body);
    }
}

pub fn storefront_controllers() -> ControllerRegistry {
    let mut controllers = ControllerRegistry::new();
    controllers
        .register_actions(&controller_id("HomeController"), home_controller())
        .register(&controller_id("ProductController"), |ctx: &RequestContext| {
            ProductController {
                request_path: ctx.path().to_string(),
            }
        });
    controllers
}

/// `auth` lets requests through only when they carry an `authorization` header.
pub fn storefront_middleware() -> MiddlewareRegistry {
    let mut middleware = MiddlewareRegistry::new();
    middleware.register("auth", |ctx: &mut RequestContext| {
        if ctx.header("authorization").is_some() {
            return true;
        }
        ctx.response_mut()
            .set_status(http::StatusCode::UNAUTHORIZED)
            .text("unauthorized");
        false
    });
    middleware
}

pub fn storefront_dispatcher() -> Dispatcher {
    Dispatcher::new(
        storefront_table(),
        storefront_controllers(),
        storefront_middleware(),
    )
}

/// Request path as the server sees it, under the application's base path.
pub fn under_root(path: &str) -> String {
    format!("/router/Example{path}")
}
