mod common;

use std::collections::HashMap;
use std::io::Write;
use std::thread;

use brrtrouter_controller::runtime_config::{MODE_ENV, REQUIRED_PARAMS_ENV};
use brrtrouter_controller::{
    ConfigurationError, ControllerApplication, ControllerClass, ControllerService, ControllerSettings, Request,
    RequiredParameterPolicy, RuntimeMode,
};
use common::Pets;
use http::Method;
use serde_json::json;
use tempfile::NamedTempFile;

fn service_for(settings: ControllerSettings) -> ControllerService {
    let mut app = ControllerApplication::new(settings);
    app.add_controllers(&[Pets::controller_type()]).unwrap();
    app.into_service()
}

#[test]
fn test_settings_from_yaml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "mode: dev").unwrap();
    writeln!(file, "required_parameter_policy: default").unwrap();
    writeln!(file, "log_routes: true").unwrap();

    let settings = ControllerSettings::from_yaml_file(file.path()).unwrap();
    assert_eq!(settings.mode, RuntimeMode::Dev);
    assert_eq!(settings.required_parameter_policy, RequiredParameterPolicy::BindDefault);
    assert!(settings.log_routes);

    let service = service_for(settings);
    assert_eq!(service.mode(), RuntimeMode::Dev);
    assert_eq!(service.settings(), &settings);
}

#[test]
fn test_missing_settings_file_reports_path() {
    let err = ControllerSettings::from_yaml_file("/nonexistent/controller.yaml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/controller.yaml"));
}

#[test]
fn test_invalid_environment_value_is_a_configuration_error() {
    let vars = HashMap::from([(MODE_ENV.to_string(), "staging".to_string())]);
    let err = ControllerSettings::from_vars(&vars).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::InvalidSetting {
            key: MODE_ENV.to_string(),
            value: "staging".to_string(),
            expected: "'dev' or 'prod'",
        }
    );

    let vars = HashMap::from([(REQUIRED_PARAMS_ENV.to_string(), "ignore".to_string())]);
    assert!(ControllerSettings::from_vars(&vars).is_err());
}

#[test]
fn test_dev_mode_renders_error_causes() {
    let service = service_for(ControllerSettings::default().with_mode(RuntimeMode::Dev));

    let resp = service.respond(Request::new(Method::GET, "/pets/99"));
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body["error"], json!("Pets.show failed: pet 99 not found"));
    assert_eq!(resp.body["causes"], json!(["pet 99 not found"]));
}

#[test]
fn test_prod_mode_hides_error_details() {
    let service = service_for(ControllerSettings::default());

    let resp = service.respond(Request::new(Method::GET, "/pets/99"));
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "error": "Internal Server Error", "status": 500 }));

    let resp = service.respond(Request::new(Method::GET, "/nowhere"));
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body["error"], json!("Not Found"));

    let resp = service.respond(Request::new(Method::GET, "/pets/x"));
    assert_eq!(resp.status, 400);
}

#[test]
fn test_action_without_value_yields_no_content() {
    let service = service_for(ControllerSettings::default());

    let resp = service.respond(Request::new(Method::DELETE, "/pets/1"));
    assert_eq!(resp.status, 204);
    assert!(resp.body.is_null());
    assert!(resp.headers.is_empty());
}

#[test]
fn test_service_is_shared_across_threads() {
    let service = service_for(ControllerSettings::default());

    thread::scope(|scope| {
        for id in [1, 2, 1, 2] {
            let service = service.clone();
            scope.spawn(move || {
                let resp = service
                    .handle(Request::new(Method::GET, format!("/pets/{id}")))
                    .unwrap();
                assert_eq!(resp.body["id"], json!(id));
            });
        }
    });
}

#[test]
fn test_frozen_pipeline_reflects_configuration() {
    let mut app = ControllerApplication::default();
    app.add_controllers(&[Pets::controller_type()]).unwrap();
    let extractors = app.extractors().names();
    let service = app.into_service();

    assert_eq!(service.pipeline().extractors().names(), extractors);
    assert_eq!(
        service.pipeline().required_parameter_policy(),
        RequiredParameterPolicy::Reject
    );
    assert_eq!(service.router().routes().len(), 4);
}
