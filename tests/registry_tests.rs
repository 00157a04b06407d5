mod common;

use brrtrouter_controller::controller::{Action, ControllerDescriptor};
use brrtrouter_controller::registry::ControllerPackage;
use brrtrouter_controller::router::HttpVerb;
use brrtrouter_controller::{ConfigurationError, Controller, ControllerApplication, ControllerClass, Request};
use common::{Keepers, Pets};
use http::Method;
use serde_json::json;

/// Lives next to `Pets` in a sub-package of `zoo`
struct Feeding;

impl Controller for Feeding {}

impl ControllerClass for Feeding {
    fn describe() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(|| Ok(Feeding))
            .package("zoo::pets::feeding")
            .action(Action::new("schedule", |_c: &mut Feeding, _ctx, _args| Ok(Some(json!(["08:00"])))).get("/feeding"))
    }
}

struct Misconfigured;

impl Controller for Misconfigured {}

impl ControllerClass for Misconfigured {
    fn describe() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(|| Ok(Misconfigured))
            .package("zoo.broken")
            .action(Action::new("ok", |_c: &mut Misconfigured, _ctx, _args| Ok(None)).get("/fine"))
            .action(Action::new("bad", |_c: &mut Misconfigured, _ctx, _args| Ok(None)).get("/bad/{id"))
    }
}

fn catalogued_app() -> ControllerApplication {
    let mut app = ControllerApplication::default();
    app.register_controller_type::<Pets>()
        .register_controller_type::<Keepers>()
        .register_controller_type::<Feeding>()
        .register_controller_type::<Misconfigured>();
    app
}

fn route_table(app: &ControllerApplication) -> Vec<(HttpVerb, String)> {
    app.router()
        .routes()
        .iter()
        .map(|r| (r.verb(), r.uri_pattern().to_string()))
        .collect()
}

#[test]
fn test_package_scan_includes_sub_packages() {
    let mut app = catalogued_app();
    app.add_controller_package_names(&["zoo.pets"]).unwrap();

    let table = route_table(&app);
    assert_eq!(
        table,
        vec![
            (HttpVerb::Get, "/pets".to_string()),
            (HttpVerb::Get, "/pets/{id}".to_string()),
            (HttpVerb::Post, "/pets".to_string()),
            (HttpVerb::Delete, "/pets/{id}".to_string()),
            (HttpVerb::Get, "/feeding".to_string()),
        ]
    );

    let service = app.into_service();
    let resp = service.handle(Request::new(Method::GET, "/feeding")).unwrap();
    assert_eq!(resp.body, json!(["08:00"]));
}

#[test]
fn test_dotted_and_path_package_names_are_equivalent() {
    let mut dotted = catalogued_app();
    dotted.add_controller_package_names(&["zoo.staff"]).unwrap();

    let mut pathed = catalogued_app();
    pathed.add_controller_package_names(&["zoo::staff"]).unwrap();

    assert_eq!(route_table(&dotted), route_table(&pathed));
    assert_eq!(route_table(&dotted), vec![(HttpVerb::Get, "/keepers".to_string())]);
}

#[test]
fn test_unknown_package_registers_nothing() {
    let mut app = catalogued_app();
    app.add_controller_package_names(&["aquarium"]).unwrap();
    app.add_controller_package_names(&[]).unwrap();
    assert!(app.router().routes().is_empty());
}

#[test]
fn test_malformed_package_name_is_a_configuration_error() {
    let mut app = catalogued_app();
    let err = app.add_controller_package_names(&["zoo.staff", "zoo..pets"]).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InvalidPackageName {
            package: "zoo..pets".to_string()
        }
    );
    assert!(app.router().routes().is_empty());
}

#[test]
fn test_bad_route_pattern_fails_the_whole_registration() {
    let mut app = catalogued_app();
    app.add_controllers(&[Keepers::controller_type()]).unwrap();

    let err = app
        .add_controllers(&[Pets::controller_type(), Misconfigured::controller_type()])
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidRoute { ref pattern, .. } if pattern == "/bad/{id"));
    assert_eq!(route_table(&app), vec![(HttpVerb::Get, "/keepers".to_string())]);
}

#[test]
fn test_explicit_packages_and_repeat_registration() {
    let mut app = ControllerApplication::default();
    let staff = ControllerPackage::new("zoo.staff").with::<Keepers>();
    assert_eq!(staff.name(), "zoo::staff");

    app.add_controller_packages(&[staff.clone()]).unwrap();
    app.add_controller_packages(&[staff]).unwrap();

    // No deduplication: the second registration adds a second, shadowed route.
    assert_eq!(app.router().routes().len(), 2);
    let service = app.into_service();
    let resp = service.handle(Request::new(Method::GET, "/keepers")).unwrap();
    assert_eq!(resp.body, json!(["Ann", "Bo"]));
}

#[test]
fn test_overloaded_action_cannot_be_routed() {
    let mut app = ControllerApplication::default();
    let err = app.get("/greet", &Keepers::controller_type(), "greet").unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::AmbiguousAction {
            controller: "Keepers".to_string(),
            action: "greet".to_string(),
            overloads: 2,
        }
    );
    assert!(err.to_string().contains("ambiguous"));
    assert!(app.router().routes().is_empty());
}

#[test]
fn test_unknown_action_cannot_be_routed() {
    let mut app = ControllerApplication::default();
    let err = app.post("/pets/adopt", &Pets::controller_type(), "adopt").unwrap_err();
    assert!(matches!(err, ConfigurationError::UnknownAction { ref action, .. } if action == "adopt"));
}

#[test]
fn test_explicit_route_gets_name_and_binding() {
    let mut app = ControllerApplication::default();
    let route = app.all("/anything", &Pets::controller_type(), "list").unwrap();

    assert_eq!(route.name(), Some("Pets.list"));
    let binding = route.binding().unwrap();
    assert_eq!((binding.controller(), binding.action()), ("Pets", "list"));

    let service = app.into_service();
    for method in [Method::GET, Method::PUT, Method::OPTIONS] {
        let resp = service.handle(Request::new(method, "/anything")).unwrap();
        assert_eq!(resp.status, 200);
    }
}
