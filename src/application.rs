//! # Controller Application
//!
//! Configuration-time facade over the router, registry, factories, extractor
//! chain and listener lists, and the [`ControllerService`] it freezes into.
//!
//! Configuration is single-threaded and happens through `&mut self`. Calling
//! [`ControllerApplication::into_service`] consumes the application: the
//! dispatch collaborators are frozen into one pipeline, every controller route
//! handler starts serving, and nothing can be added anymore.
//!
//! ```rust
//! use brrtrouter_controller::controller::{Action, ControllerClass, ControllerDescriptor};
//! use brrtrouter_controller::{Controller, ControllerApplication, Request};
//! use http::Method;
//! use serde_json::json;
//!
//! struct Hello;
//! impl Controller for Hello {}
//! impl ControllerClass for Hello {
//!     fn describe() -> ControllerDescriptor<Self> {
//!         ControllerDescriptor::new(|| Ok(Hello))
//!             .action(Action::new("index", |_c: &mut Hello, _ctx, _args| Ok(Some(json!("hi")))))
//!     }
//! }
//!
//! let mut app = ControllerApplication::default();
//! app.get("/", &Hello::controller_type(), "index").unwrap();
//!
//! let service = app.into_service();
//! let response = service.handle(Request::new(Method::GET, "/")).unwrap();
//! assert_eq!(response.body, json!("hi"));
//! ```

use std::any::TypeId;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::context::{Request, RequestContext};
use crate::controller::{ControllerClass, ControllerFactory, ControllerType, DefaultControllerFactory};
use crate::error::{ConfigurationError, DispatchError};
use crate::extractor::{ExtractorChain, MethodParameterExtractor};
use crate::handler::{
    DefaultRouteHandlerFactory, DispatchPipeline, PipelineSlot, RouteHandler, RouteHandlerFactory,
};
use crate::listener::{InitializationListenerList, InstantiationListenerList, InvokeListenerList};
use crate::registry::{ControllerCatalog, ControllerPackage, ControllerRegistry};
use crate::response::{HandlerResponse, JsonResponseWriter, ResponseWriter};
use crate::router::{
    ControllerBinding, ControllerRouter, DefaultControllerRouter, HttpVerb, Route, Router, SharedRouter,
};
use crate::runtime_config::{ControllerSettings, RuntimeMode};

/// Name of the capability `set_router` requires
const CONTROLLER_ROUTER: &str = "ControllerRouter";

/// Application being configured
pub struct ControllerApplication {
    settings: ControllerSettings,
    router: Box<dyn ControllerRouter>,
    catalog: ControllerCatalog,
    controller_factory: Arc<dyn ControllerFactory>,
    route_handler_factory: Box<dyn RouteHandlerFactory>,
    extractors: ExtractorChain,
    instantiation_listeners: InstantiationListenerList,
    initialization_listeners: InitializationListenerList,
    invoke_listeners: InvokeListenerList,
    response_writer: Arc<dyn ResponseWriter>,
    pipeline: PipelineSlot,
}

impl ControllerApplication {
    /// Application with the built-in extractors and default collaborators.
    #[must_use]
    pub fn new(settings: ControllerSettings) -> Self {
        Self::with_extractors(settings, ExtractorChain::with_defaults())
    }

    /// Application starting from an explicit extractor chain.
    ///
    /// Use [`ExtractorChain::empty`] to take full control of extractor order.
    #[must_use]
    pub fn with_extractors(settings: ControllerSettings, extractors: ExtractorChain) -> Self {
        debug!(
            mode = %settings.mode,
            policy = ?settings.required_parameter_policy,
            extractors = ?extractors,
            "Controller application created"
        );
        Self {
            settings,
            router: Box::new(DefaultControllerRouter::new()),
            catalog: ControllerCatalog::new(),
            controller_factory: Arc::new(DefaultControllerFactory),
            route_handler_factory: Box::new(DefaultRouteHandlerFactory),
            extractors,
            instantiation_listeners: InstantiationListenerList::new(),
            initialization_listeners: InitializationListenerList::new(),
            invoke_listeners: InvokeListenerList::new(),
            response_writer: Arc::new(JsonResponseWriter),
            pipeline: PipelineSlot::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    // ---------------------------------------------------------------------
    // Routes
    // ---------------------------------------------------------------------

    pub fn get(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::Get, uri_pattern, controller, action)
    }

    pub fn post(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::Post, uri_pattern, controller, action)
    }

    pub fn put(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::Put, uri_pattern, controller, action)
    }

    pub fn delete(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::Delete, uri_pattern, controller, action)
    }

    pub fn patch(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::Patch, uri_pattern, controller, action)
    }

    pub fn head(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::Head, uri_pattern, controller, action)
    }

    pub fn all(&mut self, uri_pattern: &str, controller: &ControllerType, action: &str) -> Result<Route, ConfigurationError> {
        self.route(HttpVerb::All, uri_pattern, controller, action)
    }

    /// Bind `controller.action` to `verb uri_pattern` and install the route.
    ///
    /// The action is resolved now; an unknown or overloaded name fails here.
    pub fn route(
        &mut self,
        verb: HttpVerb,
        uri_pattern: &str,
        controller: &ControllerType,
        action: &str,
    ) -> Result<Route, ConfigurationError> {
        let handler = self.create_route_handler(controller, action)?;
        let route = Route::new(verb, uri_pattern, handler)
            .named(&format!("{}.{}", controller.name(), action))
            .bound_to(ControllerBinding::new(controller, action));
        self.add_route(route.clone())?;
        Ok(route)
    }

    /// Dispatch unit for `controller.action`, not yet installed anywhere.
    pub fn create_route_handler(
        &self,
        controller: &ControllerType,
        action: &str,
    ) -> Result<Arc<dyn RouteHandler>, ConfigurationError> {
        self.route_handler_factory
            .create_handler(controller, action, &self.pipeline)
    }

    pub fn add_route(&mut self, route: Route) -> Result<(), ConfigurationError> {
        self.router.add_route(route)
    }

    // ---------------------------------------------------------------------
    // Collaborators
    // ---------------------------------------------------------------------

    /// Replace the router.
    ///
    /// Only routers that implement [`ControllerRouter`] are accepted; anything
    /// else is rejected and the current router stays in place. Routes already
    /// installed are carried over to the new router in order.
    pub fn set_router(&mut self, router: Box<dyn Router>) -> Result<(), ConfigurationError> {
        let found = router.name();
        let mut replacement = match router.into_controller_router() {
            Ok(router) => router,
            Err(rejected) => {
                warn!(
                    router = rejected.name(),
                    required = CONTROLLER_ROUTER,
                    "Router rejected"
                );
                return Err(ConfigurationError::IncompatibleRouter {
                    required: CONTROLLER_ROUTER,
                    found,
                });
            }
        };

        for route in self.router.routes() {
            replacement.add_route(route.clone())?;
        }
        debug!(
            router = replacement.name(),
            routes = replacement.routes().len(),
            "Router replaced"
        );
        self.router = replacement;
        Ok(())
    }

    #[must_use]
    pub fn router(&self) -> &dyn ControllerRouter {
        &*self.router
    }

    pub fn set_controller_factory(&mut self, factory: Arc<dyn ControllerFactory>) {
        debug!(factory = factory.name(), "Using controller factory");
        self.controller_factory = factory;
    }

    #[must_use]
    pub fn controller_factory(&self) -> &dyn ControllerFactory {
        &*self.controller_factory
    }

    pub fn set_route_handler_factory(&mut self, factory: Box<dyn RouteHandlerFactory>) {
        self.route_handler_factory = factory;
    }

    pub fn set_response_writer(&mut self, writer: Arc<dyn ResponseWriter>) {
        self.response_writer = writer;
    }

    /// Append extractors after the ones already in the chain.
    pub fn add_extractors<I>(&mut self, extractors: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn MethodParameterExtractor>>,
    {
        self.extractors.extend(extractors);
        debug!(extractors = ?self.extractors, "Extractor chain extended");
        self
    }

    #[must_use]
    pub fn extractors(&self) -> &ExtractorChain {
        &self.extractors
    }

    #[must_use]
    pub fn instantiation_listeners(&self) -> &InstantiationListenerList {
        &self.instantiation_listeners
    }

    pub fn instantiation_listeners_mut(&mut self) -> &mut InstantiationListenerList {
        &mut self.instantiation_listeners
    }

    #[must_use]
    pub fn initialization_listeners(&self) -> &InitializationListenerList {
        &self.initialization_listeners
    }

    pub fn initialization_listeners_mut(&mut self) -> &mut InitializationListenerList {
        &mut self.initialization_listeners
    }

    #[must_use]
    pub fn invoke_listeners(&self) -> &InvokeListenerList {
        &self.invoke_listeners
    }

    pub fn invoke_listeners_mut(&mut self) -> &mut InvokeListenerList {
        &mut self.invoke_listeners
    }

    // ---------------------------------------------------------------------
    // Controller discovery
    // ---------------------------------------------------------------------

    /// Controller types discoverable by package name
    pub fn catalog_mut(&mut self) -> &mut ControllerCatalog {
        &mut self.catalog
    }

    /// Make `C` discoverable through [`Self::add_controller_package_names`].
    pub fn register_controller_type<C: ControllerClass>(&mut self) -> &mut Self {
        self.catalog.add::<C>();
        self
    }

    pub fn add_controller_package_names(&mut self, packages: &[&str]) -> Result<(), ConfigurationError> {
        let routes = {
            let mut registry = self.registry();
            registry.register_package_names(packages)?;
            registry.into_routes()
        };
        self.install(routes)
    }

    pub fn add_controller_packages(&mut self, packages: &[ControllerPackage]) -> Result<(), ConfigurationError> {
        let routes = {
            let mut registry = self.registry();
            registry.register_packages(packages)?;
            registry.into_routes()
        };
        self.install(routes)
    }

    pub fn add_controllers(&mut self, controllers: &[ControllerType]) -> Result<(), ConfigurationError> {
        let routes = {
            let mut registry = self.registry();
            registry.register_controllers(controllers)?;
            registry.into_routes()
        };
        self.install(routes)
    }

    fn registry(&self) -> ControllerRegistry<'_> {
        ControllerRegistry::new(&self.catalog, &*self.route_handler_factory, &self.pipeline)
    }

    /// Add staged routes to the router; all of them or none.
    fn install(&mut self, routes: Vec<Route>) -> Result<(), ConfigurationError> {
        let installed = self.router.routes().len();
        for route in routes {
            if let Err(err) = self.router.add_route(route) {
                warn!(
                    router = self.router.name(),
                    error = %err,
                    rolled_back = self.router.routes().len() - installed,
                    "Router refused a route; registration rolled back"
                );
                self.router.truncate_routes(installed);
                return Err(err);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Serving
    // ---------------------------------------------------------------------

    /// Freeze the configuration and start serving.
    #[must_use]
    pub fn into_service(self) -> ControllerService {
        let pipeline = Arc::new(DispatchPipeline::new(
            self.controller_factory,
            self.extractors,
            self.instantiation_listeners,
            self.initialization_listeners,
            self.invoke_listeners,
            self.response_writer,
            self.settings.required_parameter_policy,
        ));
        self.pipeline.freeze(Arc::clone(&pipeline));

        let router: SharedRouter = Arc::from(self.router);
        if self.settings.should_log_routes() {
            router.dump_routes();
        }
        info!(
            mode = %self.settings.mode,
            routes = router.routes().len(),
            pipeline = ?pipeline,
            "Controller application serving"
        );

        ControllerService {
            router,
            pipeline,
            settings: Arc::new(self.settings),
        }
    }
}

impl Default for ControllerApplication {
    fn default() -> Self {
        Self::new(ControllerSettings::default())
    }
}

/// Immutable serving-time view of a configured application.
///
/// Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct ControllerService {
    router: SharedRouter,
    pipeline: Arc<DispatchPipeline>,
    settings: Arc<ControllerSettings>,
}

impl ControllerService {
    /// Route and dispatch one request.
    ///
    /// When the handler produced no response, `204 No Content` is returned.
    pub fn handle(&self, request: Request) -> Result<HandlerResponse, DispatchError> {
        let path = request.path().to_string();
        let Some(route_match) = self.router.find_route(&request.method, &path) else {
            warn!(method = %request.method, path = %path, "No route matched");
            return Err(DispatchError::NoRoute {
                method: request.method.to_string(),
                path,
            });
        };

        let mut ctx = RequestContext::from_request(request, route_match.path_params);
        let span = info_span!(
            "request",
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            route = route_match.route.name().unwrap_or("-")
        );
        let _guard = span.enter();

        if let Err(err) = route_match.route.handler().handle(&mut ctx) {
            warn!(status = err.status_code(), error = %err, "Dispatch failed");
            return Err(err);
        }
        Ok(ctx.take_response().unwrap_or_else(HandlerResponse::no_content))
    }

    /// Like [`Self::handle`], rendering failures with [`DispatchError::to_response`].
    #[must_use]
    pub fn respond(&self, request: Request) -> HandlerResponse {
        self.handle(request)
            .unwrap_or_else(|err| err.to_response(self.settings.mode))
    }

    #[must_use]
    pub fn router(&self) -> &dyn ControllerRouter {
        &*self.router
    }

    #[must_use]
    pub fn pipeline(&self) -> &DispatchPipeline {
        &self.pipeline
    }

    #[must_use]
    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    #[must_use]
    pub fn mode(&self) -> RuntimeMode {
        self.settings.mode
    }

    /// Reverse route for `controller.action`; see [`ControllerRouter::uri_for`].
    #[must_use]
    pub fn uri_for(&self, controller: &str, action: &str, params: &[(&str, &str)]) -> Option<String> {
        self.router.uri_for(controller, action, params)
    }

    /// Reverse route for `action` of the controller type `C`.
    ///
    /// Unlike [`Self::uri_for`], this cannot confuse two controllers that
    /// share a short name.
    #[must_use]
    pub fn uri_for_type<C: ControllerClass>(&self, action: &str, params: &[(&str, &str)]) -> Option<String> {
        self.router.uri_for_type(TypeId::of::<C>(), action, params)
    }
}
