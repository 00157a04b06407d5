//! Controller discovery and route generation.
//!
//! Rust has no classpath to scan, so controller types are catalogued
//! explicitly: a [`ControllerCatalog`] holds every known [`ControllerType`]
//! and answers package queries. The [`ControllerRegistry`] turns the
//! routable actions of the requested types into [`Route`]s.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::controller::{normalize_package, ControllerClass, ControllerType};
use crate::error::ConfigurationError;
use crate::handler::{PipelineSlot, RouteHandlerFactory};
use crate::router::{ControllerBinding, PatternRouter, Route};

/// A named group of controller types, registered together.
#[derive(Debug, Clone)]
pub struct ControllerPackage {
    name: String,
    types: Vec<ControllerType>,
}

impl ControllerPackage {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_package(name),
            types: Vec::new(),
        }
    }

    #[must_use]
    pub fn with<C: ControllerClass>(mut self) -> Self {
        self.types.push(C::controller_type());
        self
    }

    #[must_use]
    pub fn with_type(mut self, controller_type: ControllerType) -> Self {
        self.types.push(controller_type);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn controller_types(&self) -> &[ControllerType] {
        &self.types
    }
}

/// Every controller type the application can discover by package name.
#[derive(Debug, Clone, Default)]
pub struct ControllerCatalog {
    types: Vec<ControllerType>,
}

impl ControllerCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: ControllerClass>(&mut self) -> &mut Self {
        self.add_type(C::controller_type())
    }

    pub fn add_type(&mut self, controller_type: ControllerType) -> &mut Self {
        debug!(
            controller = %controller_type.name(),
            package = %controller_type.package(),
            "Controller catalogued"
        );
        self.types.push(controller_type);
        self
    }

    pub fn add_package(&mut self, package: &ControllerPackage) -> &mut Self {
        for controller_type in package.controller_types() {
            self.add_type(controller_type.clone());
        }
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControllerType> {
        self.types.iter()
    }

    /// Types in `package` or one of its sub-packages, in catalogue order.
    pub fn in_package(&self, package: &str) -> Result<Vec<ControllerType>, ConfigurationError> {
        validate_package_name(package)?;
        Ok(self
            .types
            .iter()
            .filter(|ty| ty.in_package(package))
            .cloned()
            .collect())
    }
}

/// Build-time aggregator of controller routes.
///
/// Each `register_*` call is all-or-nothing: if any type, action or pattern
/// fails, no route from that call is kept. Calls are additive and never
/// deduplicate.
pub struct ControllerRegistry<'a> {
    catalog: &'a ControllerCatalog,
    handler_factory: &'a dyn RouteHandlerFactory,
    pipeline: &'a PipelineSlot,
    routes: Vec<Route>,
}

impl<'a> ControllerRegistry<'a> {
    #[must_use]
    pub fn new(
        catalog: &'a ControllerCatalog,
        handler_factory: &'a dyn RouteHandlerFactory,
        pipeline: &'a PipelineSlot,
    ) -> Self {
        Self {
            catalog,
            handler_factory,
            pipeline,
            routes: Vec::new(),
        }
    }

    /// Register every catalogued type under the given package names.
    ///
    /// A well-formed name that matches nothing leaves the routes unchanged.
    pub fn register_package_names(&mut self, packages: &[&str]) -> Result<(), ConfigurationError> {
        let mut types = Vec::new();
        for package in packages {
            let found = self.catalog.in_package(package)?;
            if found.is_empty() {
                info!(package = %package, "No controllers found in package");
            }
            types.extend(found);
        }
        self.register_controllers(&types)
    }

    pub fn register_packages(&mut self, packages: &[ControllerPackage]) -> Result<(), ConfigurationError> {
        let types: Vec<ControllerType> = packages
            .iter()
            .flat_map(|p| p.controller_types().iter().cloned())
            .collect();
        self.register_controllers(&types)
    }

    pub fn register_controllers(&mut self, types: &[ControllerType]) -> Result<(), ConfigurationError> {
        let mut staged = Vec::new();
        for controller_type in types {
            self.collect_routes(controller_type, &mut staged)?;
        }

        if !staged.is_empty() {
            info!(
                controllers = types.len(),
                routes = staged.len(),
                total = self.routes.len() + staged.len(),
                "Controller routes registered"
            );
        }
        self.routes.extend(staged);
        Ok(())
    }

    fn collect_routes(
        &self,
        controller_type: &ControllerType,
        staged: &mut Vec<Route>,
    ) -> Result<(), ConfigurationError> {
        for action in controller_type.actions().filter(|a| a.is_routable()) {
            let handler = self
                .handler_factory
                .create_handler(controller_type, action.name(), self.pipeline)?;
            let name = format!("{}.{}", controller_type.name(), action.name());

            for annotation in action.routes() {
                let uri = join_paths(controller_type.path(), &annotation.uri_pattern);
                PatternRouter::compile_pattern(&uri)?;
                debug!(
                    verb = %annotation.verb,
                    pattern = %uri,
                    route = %name,
                    "Controller route discovered"
                );
                staged.push(
                    Route::new(annotation.verb, &uri, Arc::clone(&handler))
                        .named(&name)
                        .bound_to(ControllerBinding::new(controller_type, action.name())),
                );
            }
        }
        Ok(())
    }

    /// Routes in discovery order
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[must_use]
    pub fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

impl fmt::Debug for ControllerRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("catalog", &self.catalog.len())
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}

/// `app.web`, `app::web` and `app` are valid; `app..web`, `9app` and `` are not.
fn validate_package_name(package: &str) -> Result<(), ConfigurationError> {
    let normalized = normalize_package(package);
    let valid = !normalized.is_empty()
        && normalized.split("::").all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidPackageName {
            package: package.to_string(),
        })
    }
}

/// Join a controller path prefix and an action pattern with exactly one `/`.
fn join_paths(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let pattern = pattern.trim_start_matches('/');
    match (prefix.is_empty(), pattern.is_empty()) {
        (true, true) => "/".to_string(),
        (true, false) => format!("/{pattern}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{pattern}"),
    }
}
