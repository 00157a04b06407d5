use std::any::TypeId;
use std::sync::Arc;

use http::Method;

use super::core::{PatternRouter, Route, RouteMatch, Router};
use crate::error::ConfigurationError;

/// Router that knows which controller action each route was built for.
///
/// This is the capability the controller application requires: it enables
/// lookups by `(controller, action)` and reverse URL generation.
pub trait ControllerRouter: Router {
    /// First route bound to `controller.action`.
    ///
    /// `controller` is the short name, the package-qualified name or the Rust
    /// type name. Two types sharing a short name are told apart only by the
    /// longer forms; see [`Self::find_route_for_type`].
    fn find_controller_route(&self, controller: &str, action: &str) -> Option<&Route> {
        self.routes().iter().find(|route| {
            route
                .binding()
                .is_some_and(|b| b.is_named(controller) && b.action() == action)
        })
    }

    /// First route bound to `action` of the controller with Rust type id `type_id`
    fn find_route_for_type(&self, type_id: TypeId, action: &str) -> Option<&Route> {
        self.routes().iter().find(|route| {
            route
                .binding()
                .is_some_and(|b| b.type_id() == type_id && b.action() == action)
        })
    }

    /// Routes carrying a controller binding, in insertion order
    fn controller_routes(&self) -> Vec<&Route> {
        self.routes()
            .iter()
            .filter(|route| route.binding().is_some())
            .collect()
    }

    /// Build the URL of `controller.action` from its route pattern.
    ///
    /// Pattern parameters are filled from `params` and percent-encoded;
    /// remaining pairs become the query string. Returns `None` when no route
    /// is bound to the action or a pattern parameter is missing.
    fn uri_for(&self, controller: &str, action: &str, params: &[(&str, &str)]) -> Option<String> {
        let route = self.find_controller_route(controller, action)?;
        expand_pattern(route.uri_pattern(), params)
    }

    /// Like [`Self::uri_for`], keyed by the controller's Rust type id.
    fn uri_for_type(&self, type_id: TypeId, action: &str, params: &[(&str, &str)]) -> Option<String> {
        let route = self.find_route_for_type(type_id, action)?;
        expand_pattern(route.uri_pattern(), params)
    }
}

/// Substitute `{name}` segments of `pattern`; unused params go to the query.
#[must_use]
pub fn expand_pattern(pattern: &str, params: &[(&str, &str)]) -> Option<String> {
    let mut path = String::with_capacity(pattern.len() + 16);
    let mut used: Vec<&str> = Vec::new();

    for segment in pattern.split('/').filter(|s| !s.is_empty()) {
        path.push('/');
        match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => {
                let (_, value) = params.iter().rev().find(|(k, _)| *k == name)?;
                path.push_str(&urlencoding::encode(value));
                used.push(name);
            }
            None => path.push_str(segment),
        }
    }
    if path.is_empty() {
        path.push('/');
    }

    let mut extra = params.iter().filter(|(k, _)| !used.contains(k)).peekable();
    if extra.peek().is_some() {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in extra {
            query.append_pair(k, v);
        }
        path.push('?');
        path.push_str(&query.finish());
    }
    Some(path)
}

/// The router installed by default: a [`PatternRouter`] with controller lookups.
#[derive(Default)]
pub struct DefaultControllerRouter {
    inner: PatternRouter,
}

impl DefaultControllerRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Router for DefaultControllerRouter {
    fn add_route(&mut self, route: Route) -> Result<(), ConfigurationError> {
        self.inner.add_route(route)
    }

    fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.inner.find_route(method, path)
    }

    fn routes(&self) -> &[Route] {
        self.inner.routes()
    }

    fn truncate_routes(&mut self, len: usize) {
        self.inner.truncate_routes(len);
    }

    fn into_controller_router(self: Box<Self>) -> Result<Box<dyn ControllerRouter>, Box<dyn Router>> {
        Ok(self as Box<dyn ControllerRouter>)
    }

    fn name(&self) -> &'static str {
        "DefaultControllerRouter"
    }
}

impl ControllerRouter for DefaultControllerRouter {}

/// Share a route table between threads once serving starts.
pub(crate) type SharedRouter = Arc<dyn ControllerRouter>;
