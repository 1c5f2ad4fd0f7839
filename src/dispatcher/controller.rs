//! Controller resolution.
//!
//! A controller route names a controller identifier and an action. Turning the
//! identifier into a live instance is the application's job, through a
//! [`ControllerResolver`]; the dispatcher only asks whether the instance
//! exists and whether it has the action.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::context::RequestContext;

/// A constructed controller, valid for one request.
pub trait Controller: Send {
    /// Whether `action` can be invoked on this controller.
    fn has_action(&self, action: &str) -> bool;

    /// Run `action`. Only called after `has_action` returned `true`.
    fn call(&mut self, action: &str, ctx: &mut RequestContext);
}

/// Builds controllers from their identifiers.
pub trait ControllerResolver: Send + Sync {
    /// `None` when `controller` does not name a constructible type.
    fn resolve(&self, controller: &str, ctx: &RequestContext) -> Option<Box<dyn Controller>>;
}

/// Signature of a single controller action.
pub type ActionFn = dyn Fn(&mut RequestContext) + Send + Sync;

/// A controller assembled from named closures.
#[derive(Clone, Default)]
pub struct ActionController {
    actions: HashMap<String, Arc<ActionFn>>,
}

impl ActionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn action<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.actions.insert(name.to_string(), Arc::new(f));
        self
    }
}

impl fmt::Debug for ActionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionController")
            .field("actions", &names)
            .finish()
    }
}

impl Controller for ActionController {
    fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    fn call(&mut self, action: &str, ctx: &mut RequestContext) {
        if let Some(f) = self.actions.get(action) {
            f(ctx);
        }
    }
}

type Factory = dyn Fn(&RequestContext) -> Box<dyn Controller> + Send + Sync;

/// Map-backed [`ControllerResolver`].
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, Arc<Factory>>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory invoked once per dispatched request.
    pub fn register<F, C>(&mut self, controller: &str, factory: F) -> &mut Self
    where
        F: Fn(&RequestContext) -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        self.factories.insert(
            controller.to_string(),
            Arc::new(move |ctx: &RequestContext| Box::new(factory(ctx)) as Box<dyn Controller>),
        );
        self
    }

    /// Register a stateless [`ActionController`]; every request gets a clone.
    pub fn register_actions(&mut self, controller: &str, actions: ActionController) -> &mut Self {
        self.register(controller, move |_| actions.clone())
    }

    #[must_use]
    pub fn contains(&self, controller: &str) -> bool {
        self.factories.contains_key(controller)
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ControllerRegistry")
            .field("controllers", &names)
            .finish()
    }
}

impl ControllerResolver for ControllerRegistry {
    fn resolve(&self, controller: &str, ctx: &RequestContext) -> Option<Box<dyn Controller>> {
        self.factories.get(controller).map(|factory| factory(ctx))
    }
}
