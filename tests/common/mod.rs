#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use brrtrouter_controller::controller::{
    Action, Arguments, ControllerDescriptor, ControllerMethod, ParamKind, ParamSource, ParameterDescriptor,
};
use brrtrouter_controller::listener::{
    ControllerInitializationListener, ControllerInstantiationListener, ControllerInvokeListener,
};
use brrtrouter_controller::{Controller, ControllerClass, HandlerResponse, RequestContext};
use serde_json::{json, Value};

/// Shared, ordered record of pipeline events
pub type Trail = Arc<Mutex<Vec<String>>>;

pub fn trail() -> Trail {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn record(trail: &Trail, event: impl Into<String>) {
    trail.lock().unwrap().push(event.into());
}

pub fn entries(trail: &Trail) -> Vec<String> {
    trail.lock().unwrap().clone()
}

/// Listener for all three sequences; records `<stage>:<label>`.
pub struct Step {
    label: &'static str,
    trail: Trail,
    fail: bool,
}

impl Step {
    pub fn new(label: &'static str, trail: &Trail) -> Arc<Self> {
        Arc::new(Self {
            label,
            trail: Arc::clone(trail),
            fail: false,
        })
    }

    pub fn failing(label: &'static str, trail: &Trail) -> Arc<Self> {
        Arc::new(Self {
            label,
            trail: Arc::clone(trail),
            fail: true,
        })
    }

    fn visit(&self, stage: &str, method: &ControllerMethod) -> anyhow::Result<()> {
        record(&self.trail, format!("{stage}:{}", self.label));
        if self.fail {
            anyhow::bail!("{} refused {:?}", self.label, method);
        }
        Ok(())
    }
}

impl ControllerInstantiationListener for Step {
    fn on_instantiation(
        &self,
        _ctx: &mut RequestContext,
        _controller: &mut dyn Controller,
        method: &ControllerMethod,
    ) -> anyhow::Result<()> {
        self.visit("instantiate", method)
    }
}

impl ControllerInitializationListener for Step {
    fn on_initialization(
        &self,
        _ctx: &mut RequestContext,
        _controller: &mut dyn Controller,
        method: &ControllerMethod,
    ) -> anyhow::Result<()> {
        self.visit("init", method)
    }
}

impl ControllerInvokeListener for Step {
    fn on_invoke(
        &self,
        _ctx: &mut RequestContext,
        _controller: &mut dyn Controller,
        method: &ControllerMethod,
        _args: &Arguments,
    ) -> anyhow::Result<()> {
        self.visit("invoke", method)
    }
}

/// Error type actions return so callers can downcast it.
#[derive(Debug, PartialEq, Eq)]
pub enum PetError {
    NotFound(i64),
}

impl fmt::Display for PetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PetError::NotFound(id) => write!(f, "pet {id} not found"),
        }
    }
}

impl std::error::Error for PetError {}

/// Small pet store used across the integration tests
pub struct Pets {
    pets: HashMap<i64, Value>,
}

impl Controller for Pets {}

impl ControllerClass for Pets {
    fn describe() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(|| {
            let mut pets = HashMap::new();
            pets.insert(1, json!({ "id": 1, "name": "Rex" }));
            pets.insert(2, json!({ "id": 2, "name": "Tom" }));
            Ok(Pets { pets })
        })
        .package("zoo.pets")
        .path("/pets")
        .action(
            Action::new("list", |c: &mut Pets, _ctx, args: &Arguments| {
                let limit: usize = args.parse(0)?;
                let mut ids: Vec<_> = c.pets.keys().copied().collect();
                ids.sort_unstable();
                if limit > 0 {
                    ids.truncate(limit);
                }
                Ok(Some(Value::Array(ids.iter().map(|id| c.pets[id].clone()).collect())))
            })
            .parameter(
                ParameterDescriptor::new("limit", ParamKind::Integer)
                    .source(ParamSource::Query)
                    .optional(),
            )
            .get("/"),
        )
        .action(
            Action::new("show", |c: &mut Pets, _ctx, args: &Arguments| {
                let id: i64 = args.parse(0)?;
                match c.pets.get(&id) {
                    Some(pet) => Ok(Some(pet.clone())),
                    None => Err(PetError::NotFound(id).into()),
                }
            })
            .parameter(ParameterDescriptor::new("id", ParamKind::Integer).source(ParamSource::Path))
            .get("/{id}"),
        )
        .action(
            Action::new("create", |_c: &mut Pets, ctx: &mut RequestContext, args: &Arguments| {
                let pet = args.get(0).cloned().unwrap_or(Value::Null);
                ctx.set_response(HandlerResponse::json(201, Value::Null));
                Ok(Some(pet))
            })
            .parameter(ParameterDescriptor::new("pet", ParamKind::Json).source(ParamSource::Body))
            .post("/"),
        )
        .action(
            Action::new("remove", |_c: &mut Pets, _ctx, _args| Ok(None))
                .param("id", ParamKind::Integer)
                .delete("/{id}"),
        )
    }
}

/// Controller under a sibling package, reachable only by explicit routes
pub struct Keepers;

impl Controller for Keepers {}

impl ControllerClass for Keepers {
    fn describe() -> ControllerDescriptor<Self> {
        ControllerDescriptor::new(|| Ok(Keepers))
            .package("zoo.staff")
            .path("/keepers")
            .action(Action::new("roster", |_c: &mut Keepers, _ctx, _args| Ok(Some(json!(["Ann", "Bo"])))).get("/"))
            .action(Action::new("greet", |_c: &mut Keepers, _ctx, _args| Ok(Some(json!("hi")))))
            .action(Action::new("greet", |_c: &mut Keepers, _ctx, _args| Ok(Some(json!("hello")))))
    }
}
