//! Router core: route table and request matching.

use std::any::TypeId;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use regex::Regex;
use tracing::{debug, info};

use super::controller::ControllerRouter;
use crate::context::ParamVec;
use crate::controller::{normalize_package, ControllerType};
use crate::error::ConfigurationError;
use crate::handler::RouteHandler;

/// HTTP verb a route answers to. `All` matches every method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    All,
}

impl HttpVerb {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::All => "ALL",
        }
    }

    /// Whether a request with `method` is answered by this verb
    #[must_use]
    pub fn matches(self, method: &Method) -> bool {
        match self {
            HttpVerb::All => true,
            HttpVerb::Get => *method == Method::GET,
            HttpVerb::Post => *method == Method::POST,
            HttpVerb::Put => *method == Method::PUT,
            HttpVerb::Delete => *method == Method::DELETE,
            HttpVerb::Patch => *method == Method::PATCH,
            HttpVerb::Head => *method == Method::HEAD,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "DELETE" => Ok(HttpVerb::Delete),
            "PATCH" => Ok(HttpVerb::Patch),
            "HEAD" => Ok(HttpVerb::Head),
            "ALL" | "*" => Ok(HttpVerb::All),
            _ => Err(ConfigurationError::InvalidSetting {
                key: "verb".to_string(),
                value: s.to_string(),
                expected: "one of GET, POST, PUT, DELETE, PATCH, HEAD or ALL",
            }),
        }
    }
}

/// The `(controller type, action)` a route was generated for.
///
/// The short controller name is not unique across packages, so the binding
/// also keeps the package and the Rust type identity of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerBinding {
    controller: Arc<str>,
    package: Arc<str>,
    type_id: TypeId,
    type_name: &'static str,
    action: Arc<str>,
}

impl ControllerBinding {
    #[must_use]
    pub fn new(controller: &ControllerType, action: &str) -> Self {
        Self {
            controller: Arc::from(controller.name()),
            package: Arc::from(controller.package()),
            type_id: controller.type_id(),
            type_name: controller.type_name(),
            action: Arc::from(action),
        }
    }

    /// Short controller name, e.g. `Users`
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// `package::Name`, or just the name for controllers without a package
    #[must_use]
    pub fn qualified_controller(&self) -> String {
        if self.package.is_empty() {
            self.controller.to_string()
        } else {
            format!("{}::{}", self.package, self.controller)
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Whether `controller` names this binding's controller.
    ///
    /// Accepts the short name, the package-qualified name (`admin.Users` and
    /// `admin::Users` are equivalent) or the full Rust type name.
    #[must_use]
    pub fn is_named(&self, controller: &str) -> bool {
        if controller == &*self.controller || controller == self.type_name {
            return true;
        }
        let controller = normalize_package(controller);
        controller
            .strip_suffix(&*self.controller)
            .and_then(|prefix| prefix.strip_suffix("::"))
            .is_some_and(|package| package == &*self.package)
    }
}

/// An immutable `(uri pattern, verb, handler)` triple.
///
/// Routes produced for controller actions also carry a [`ControllerBinding`]
/// that controller-aware routers use for lookups and reverse routing.
#[derive(Clone)]
pub struct Route {
    uri_pattern: Arc<str>,
    verb: HttpVerb,
    handler: Arc<dyn RouteHandler>,
    name: Option<Arc<str>>,
    binding: Option<ControllerBinding>,
}

impl Route {
    #[must_use]
    pub fn new(verb: HttpVerb, uri_pattern: &str, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            uri_pattern: Arc::from(uri_pattern),
            verb,
            handler,
            name: None,
            binding: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Arc::from(name));
        self
    }

    #[must_use]
    pub fn bound_to(mut self, binding: ControllerBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    #[must_use]
    pub fn uri_pattern(&self) -> &str {
        &self.uri_pattern
    }

    #[must_use]
    pub fn verb(&self) -> HttpVerb {
        self.verb
    }

    #[must_use]
    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn binding(&self) -> Option<&ControllerBinding> {
        self.binding.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("verb", &self.verb)
            .field("uri_pattern", &self.uri_pattern)
            .field("name", &self.name)
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}

/// Result of matching a request to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Route,
    /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Uses "last write wins" for duplicate names at different depths.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Generic router: an ordered route table with request matching.
///
/// A router that also implements [`ControllerRouter`] hands itself over from
/// [`Router::into_controller_router`]; the application only accepts routers
/// that do.
pub trait Router: Send + Sync {
    /// Install a route after every existing one.
    fn add_route(&mut self, route: Route) -> Result<(), ConfigurationError>;

    /// First route matching `method` and `path`, in insertion order.
    fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch>;

    fn routes(&self) -> &[Route];

    /// Drop every route installed after the first `len`.
    ///
    /// Used to roll back a registration the router only partly accepted.
    fn truncate_routes(&mut self, len: usize);

    /// Convert into the controller-aware capability, or give the router back.
    fn into_controller_router(self: Box<Self>) -> Result<Box<dyn ControllerRouter>, Box<dyn Router>>;

    /// Name used in logs and configuration errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Log every registered route at info level.
    fn dump_routes(&self) {
        info!(router = self.name(), count = self.routes().len(), "Route table");
        for route in self.routes() {
            info!(
                verb = %route.verb(),
                pattern = %route.uri_pattern(),
                name = route.name().unwrap_or("-"),
                "Route"
            );
        }
    }
}

struct CompiledPattern {
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

/// Regex-backed router for `{name}` path patterns.
///
/// Routes are tested in insertion order; the first match wins.
#[derive(Default)]
pub struct PatternRouter {
    routes: Vec<Route>,
    compiled: Vec<CompiledPattern>,
}

impl PatternRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a path pattern to a regex and its ordered parameter names.
    ///
    /// `/users/{id}` becomes `^/users/([^/]+)$` with parameters `["id"]`.
    /// Static segments are matched literally.
    pub fn compile_pattern(pattern: &str) -> Result<(Regex, Vec<Arc<str>>), ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidRoute {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut param_names: Vec<Arc<str>> = Vec::with_capacity(pattern.matches('{').count());

        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if name.is_empty() || name.contains(['{', '}', '/']) {
                    return Err(invalid("parameter segments must look like '{name}'"));
                }
                if param_names.iter().any(|p| p.as_ref() == name) {
                    return Err(invalid("duplicate parameter name"));
                }
                expr.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else if segment.contains(['{', '}']) {
                return Err(invalid("unbalanced '{' or '}'"));
            } else {
                expr.push('/');
                expr.push_str(&regex::escape(segment));
            }
        }

        if param_names.is_empty() && expr.len() == 1 {
            expr.push('/');
        }
        expr.push('$');

        let compiled = Regex::new(&expr).map_err(|e| invalid(&e.to_string()))?;
        Ok((compiled, param_names))
    }
}

impl Router for PatternRouter {
    fn add_route(&mut self, route: Route) -> Result<(), ConfigurationError> {
        let (regex, param_names) = Self::compile_pattern(route.uri_pattern())?;
        debug!(
            verb = %route.verb(),
            pattern = %route.uri_pattern(),
            params = ?param_names,
            "Route added"
        );
        self.compiled.push(CompiledPattern { regex, param_names });
        self.routes.push(route);
        Ok(())
    }

    fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let found = self
            .routes
            .iter()
            .zip(&self.compiled)
            .filter(|(route, _)| route.verb().matches(method))
            .find_map(|(route, compiled)| {
                let captures = compiled.regex.captures(path)?;
                let path_params: ParamVec = compiled
                    .param_names
                    .iter()
                    .zip(captures.iter().skip(1))
                    .filter_map(|(name, value)| {
                        let raw = value?.as_str();
                        let decoded = urlencoding::decode(raw)
                            .map(|s| s.into_owned())
                            .unwrap_or_else(|_| raw.to_string());
                        Some((Arc::clone(name), decoded))
                    })
                    .collect();
                Some(RouteMatch {
                    route: route.clone(),
                    path_params,
                })
            });

        match &found {
            Some(m) => debug!(
                method = %method,
                path = %path,
                route_pattern = %m.route.uri_pattern(),
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        found
    }

    fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn truncate_routes(&mut self, len: usize) {
        self.routes.truncate(len);
        self.compiled.truncate(len);
    }

    fn into_controller_router(self: Box<Self>) -> Result<Box<dyn ControllerRouter>, Box<dyn Router>> {
        Err(self as Box<dyn Router>)
    }

    fn name(&self) -> &'static str {
        "PatternRouter"
    }
}
