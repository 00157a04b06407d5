mod common;

use brrtrouter_controller::controller::{Action, ControllerDescriptor};
use brrtrouter_controller::router::{
    ControllerRouter, DefaultControllerRouter, PatternRouter, Route, RouteMatch, Router,
};
use brrtrouter_controller::{ConfigurationError, Controller, ControllerApplication, ControllerClass, Request};
use common::{Keepers, Pets};
use http::Method;
use serde_json::json;

fn app_with_pets() -> ControllerApplication {
    let mut app = ControllerApplication::default();
    app.add_controllers(&[Pets::controller_type()]).unwrap();
    app
}

#[test]
fn test_plain_router_is_rejected_and_previous_router_kept() {
    let mut app = app_with_pets();
    let before = app.router().routes().len();

    let err = app.set_router(Box::new(PatternRouter::new())).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::IncompatibleRouter {
            required: "ControllerRouter",
            found: "PatternRouter",
        }
    );
    assert_eq!(
        err.to_string(),
        "'router' must be an instance of 'ControllerRouter' (got 'PatternRouter')"
    );

    assert_eq!(app.router().name(), "DefaultControllerRouter");
    assert_eq!(app.router().routes().len(), before);
    let service = app.into_service();
    assert_eq!(service.handle(Request::new(Method::GET, "/pets/1")).unwrap().status, 200);
}

/// Controller-aware router that only serves paths under a prefix
#[derive(Default)]
struct PrefixedRouter {
    inner: DefaultControllerRouter,
}

impl Router for PrefixedRouter {
    fn add_route(&mut self, route: Route) -> Result<(), ConfigurationError> {
        self.inner.add_route(route)
    }

    fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let rest = path.strip_prefix("/api")?;
        self.inner.find_route(method, if rest.is_empty() { "/" } else { rest })
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
        "PrefixedRouter"
    }
}

impl ControllerRouter for PrefixedRouter {
    fn uri_for(&self, controller: &str, action: &str, params: &[(&str, &str)]) -> Option<String> {
        self.inner
            .uri_for(controller, action, params)
            .map(|uri| format!("/api{uri}"))
    }
}

#[test]
fn test_controller_router_replaces_default_and_keeps_routes() {
    let mut app = app_with_pets();
    app.set_router(Box::new(PrefixedRouter::default())).unwrap();
    app.add_controllers(&[Keepers::controller_type()]).unwrap();

    assert_eq!(app.router().name(), "PrefixedRouter");
    assert_eq!(app.router().controller_routes().len(), 5);

    let service = app.into_service();
    assert_eq!(
        service.handle(Request::new(Method::GET, "/api/pets/2")).unwrap().body,
        json!({ "id": 2, "name": "Tom" })
    );
    assert_eq!(
        service.handle(Request::new(Method::GET, "/api/keepers")).unwrap().body,
        json!(["Ann", "Bo"])
    );
    assert!(service.handle(Request::new(Method::GET, "/pets/2")).is_err());
    assert_eq!(service.uri_for("Pets", "show", &[("id", "2")]).as_deref(), Some("/api/pets/2"));
}

#[test]
fn test_reverse_routing_through_the_service() {
    let service = app_with_pets().into_service();

    assert_eq!(service.uri_for("Pets", "show", &[("id", "7")]).as_deref(), Some("/pets/7"));
    assert_eq!(
        service.uri_for("Pets", "show", &[("id", "a b"), ("format", "json")]).as_deref(),
        Some("/pets/a%20b?format=json")
    );
    assert_eq!(service.uri_for("Pets", "list", &[]).as_deref(), Some("/pets"));
    assert_eq!(service.uri_for("Pets", "show", &[]), None);
    assert_eq!(service.uri_for("Pets", "adopt", &[("id", "7")]), None);
}

#[test]
fn test_controller_route_lookup() {
    let app = app_with_pets();
    let route = app.router().find_controller_route("Pets", "create").unwrap();
    assert_eq!(route.verb().as_str(), "POST");
    assert_eq!(route.uri_pattern(), "/pets");
    assert!(app.router().find_controller_route("Keepers", "roster").is_none());
}

#[test]
fn test_unmatched_verb_and_path_yield_no_route() {
    let service = app_with_pets().into_service();

    let err = service.handle(Request::new(Method::PATCH, "/pets/1")).unwrap_err();
    assert_eq!(err.status_code(), 404);
    let err = service.handle(Request::new(Method::GET, "/cats")).unwrap_err();
    assert!(err.to_string().contains("/cats"));
}

/// Controller router that refuses patterns with an `{id}` segment
#[derive(Default)]
struct NoIdRouter {
    inner: DefaultControllerRouter,
}

impl Router for NoIdRouter {
    fn add_route(&mut self, route: Route) -> Result<(), ConfigurationError> {
        if route.uri_pattern().contains("{id}") {
            return Err(ConfigurationError::InvalidRoute {
                pattern: route.uri_pattern().to_string(),
                reason: "id segments are not served here".to_string(),
            });
        }
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
        "NoIdRouter"
    }
}

impl ControllerRouter for NoIdRouter {}

#[test]
fn test_route_refused_by_router_rolls_back_the_whole_registration() {
    let mut app = ControllerApplication::default();
    app.set_router(Box::new(NoIdRouter::default())).unwrap();
    app.add_controllers(&[Keepers::controller_type()]).unwrap();

    // `GET /pets` is accepted before `GET /pets/{id}` is refused.
    let err = app.add_controllers(&[Pets::controller_type()]).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidRoute { ref pattern, .. } if pattern == "/pets/{id}"));

    let patterns: Vec<_> = app.router().routes().iter().map(|r| r.uri_pattern()).collect();
    assert_eq!(patterns, vec!["/keepers"]);

    let service = app.into_service();
    assert!(service.handle(Request::new(Method::GET, "/pets")).is_err());
    assert_eq!(service.handle(Request::new(Method::GET, "/keepers")).unwrap().status, 200);
}

mod admin {
    use super::*;

    pub struct Users;
    impl Controller for Users {}
    impl ControllerClass for Users {
        fn describe() -> ControllerDescriptor<Self> {
            ControllerDescriptor::new(|| Ok(Users))
                .package("admin")
                .path("/admin/users")
                .action(Action::new("show", |_c: &mut Users, _ctx, _args| Ok(Some(json!("admin")))).get("/{id}"))
        }
    }
}

mod api {
    use super::*;

    pub struct Users;
    impl Controller for Users {}
    impl ControllerClass for Users {
        fn describe() -> ControllerDescriptor<Self> {
            ControllerDescriptor::new(|| Ok(Users))
                .package("api")
                .path("/api/users")
                .action(Action::new("show", |_c: &mut Users, _ctx, _args| Ok(Some(json!("api")))).get("/{id}"))
        }
    }
}

#[test]
fn test_controllers_sharing_a_short_name_stay_distinct() {
    let mut app = ControllerApplication::default();
    app.add_controllers(&[admin::Users::controller_type(), api::Users::controller_type()])
        .unwrap();

    let admin_route = app.router().find_controller_route("admin::Users", "show").unwrap();
    let api_route = app.router().find_controller_route("api.Users", "show").unwrap();
    assert_eq!(admin_route.uri_pattern(), "/admin/users/{id}");
    assert_eq!(api_route.uri_pattern(), "/api/users/{id}");
    assert_ne!(admin_route.binding(), api_route.binding());

    let api_binding = api_route.binding().unwrap();
    assert_eq!(api_binding.controller(), "Users");
    assert_eq!(api_binding.package(), "api");
    assert_eq!(api_binding.qualified_controller(), "api::Users");
    assert!(api_binding.is_named(std::any::type_name::<api::Users>()));

    let service = app.into_service();
    assert_eq!(
        service.uri_for_type::<api::Users>("show", &[("id", "1")]).as_deref(),
        Some("/api/users/1")
    );
    assert_eq!(
        service.uri_for_type::<admin::Users>("show", &[("id", "1")]).as_deref(),
        Some("/admin/users/1")
    );
    assert_eq!(
        service.uri_for("api::Users", "show", &[("id", "1")]).as_deref(),
        Some("/api/users/1")
    );
    assert_eq!(service.uri_for_type::<Pets>("show", &[("id", "1")]), None);
}
