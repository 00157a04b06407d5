//! Command-line driver: dispatches requests through a small set of demo
//! controllers without an HTTP server.

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use brrtrouter_controller::controller::{
    Action, Arguments, ControllerClass, ControllerDescriptor, ParamKind, ParamSource, ParameterDescriptor,
};
use brrtrouter_controller::logging::{init_logging_with_config, LogConfig};
use brrtrouter_controller::router::HttpVerb;
use brrtrouter_controller::{
    Controller, ControllerApplication, ControllerSettings, Request, RequestContext, RuntimeMode,
};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Parser)]
#[command(name = "brrtrouter-controller")]
#[command(about = "Dispatch requests through demo controllers", long_about = None)]
struct Cli {
    /// Settings file (YAML); takes precedence over BRRTR_* variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Runtime mode override: dev or prod
    #[arg(long, global = true)]
    mode: Option<RuntimeMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the installed routes
    Routes,
    /// Dispatch one request and print the response
    Request {
        /// HTTP method
        method: String,
        /// Request target, e.g. `/pets/1?verbose=true`
        target: String,
        /// Header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

/// Greets by name; the name comes from the path.
struct Greeter {
    greeting: &'static str,
}

impl Controller for Greeter {
    fn on_init(&mut self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        if ctx.get_header("accept-language").is_some_and(|l| l.starts_with("fr")) {
            self.greeting = "bonjour";
        }
        Ok(())
    }
}

impl ControllerClass for Greeter {
    fn describe() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(|| Ok(Greeter { greeting: "hello" }))
            .package("demo.greeting")
            .path("/greet")
            .action(
                Action::new("hello", |c: &mut Greeter, _ctx, args: &Arguments| {
                    let name: String = args.parse(0)?;
                    Ok(Some(json!({ "greeting": format!("{} {name}", c.greeting) })))
                })
                .param("name", ParamKind::String)
                .get("/{name}"),
            )
    }
}

/// Read-only pet listing backed by a fixed table.
struct Pets {
    pets: Vec<Value>,
}

impl Controller for Pets {}

impl ControllerClass for Pets {
    fn describe() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(|| {
            Ok(Pets {
                pets: vec![
                    json!({ "id": 1, "name": "Rex", "tag": "dog" }),
                    json!({ "id": 2, "name": "Tom", "tag": "cat" }),
                    json!({ "id": 3, "name": "Nemo", "tag": "fish" }),
                ],
            })
        })
        .package("demo.pets")
        .path("/pets")
        .action(
            Action::new("list", |c: &mut Pets, _ctx, args: &Arguments| {
                let limit: usize = args.parse(0)?;
                let limit = if limit == 0 { c.pets.len() } else { limit };
                Ok(Some(Value::Array(c.pets.iter().take(limit).cloned().collect())))
            })
            .parameter(
                ParameterDescriptor::new("limit", ParamKind::Integer)
                    .source(ParamSource::Query)
                    .optional(),
            )
            .get("/"),
        )
        .action(
            Action::new("show", |c: &mut Pets, ctx: &mut RequestContext, args: &Arguments| {
                let id: i64 = args.parse(0)?;
                match c.pets.iter().find(|p| p["id"] == json!(id)) {
                    Some(pet) => Ok(Some(pet.clone())),
                    None => {
                        ctx.set_response(brrtrouter_controller::HandlerResponse::error(404, "pet not found"));
                        Ok(None)
                    }
                }
            })
            .parameter(ParameterDescriptor::new("id", ParamKind::Integer).source(ParamSource::Path))
            .route(HttpVerb::Get, "/{id}"),
        )
    }
}

fn build_request(method: &str, target: &str, headers: &[String], body: Option<&str>) -> anyhow::Result<Request> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{method}'"))?;
    let mut request = Request::new(method, target);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header '{header}' must look like 'name: value'"))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(body) = body {
        let body: Value = serde_json::from_str(body).context("body is not valid JSON")?;
        request = request.with_body(body);
    }
    Ok(request)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => ControllerSettings::from_yaml_file(path)?,
        None => ControllerSettings::from_env()?,
    };
    if let Some(mode) = cli.mode {
        settings = settings.with_mode(mode);
    }

    let _log_guard = init_logging_with_config(&LogConfig::from_env(settings.mode))?;
    debug!(?settings, "Settings loaded");

    let mut app = ControllerApplication::new(settings);
    app.register_controller_type::<Greeter>()
        .register_controller_type::<Pets>();
    app.add_controller_package_names(&["demo"])?;
    let service = app.into_service();

    match cli.command {
        Commands::Routes => {
            for route in service.router().routes() {
                println!(
                    "{:<6} {:<20} {}",
                    route.verb().as_str(),
                    route.uri_pattern(),
                    route.name().unwrap_or("-")
                );
            }
        }
        Commands::Request {
            method,
            target,
            headers,
            body,
        } => {
            let request = build_request(&method, &target, &headers, body.as_deref())?;
            let response = service.respond(request);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
