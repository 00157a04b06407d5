use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::params::{Arguments, ParamKind, ParameterDescriptor};
use crate::context::RequestContext;
use crate::error::ConfigurationError;
use crate::router::HttpVerb;

/// A request-scoped object exposing actions.
///
/// A fresh instance is built for every dispatch and dropped once the response
/// is produced, so implementations never see concurrent requests.
pub trait Controller: Send + 'static {
    /// Runs once per dispatch, after instantiation listeners and before the
    /// initialization listeners.
    fn on_init(&mut self, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A controller type that can describe itself.
///
/// This is the explicit replacement for reflective class scanning: the
/// descriptor names the constructor and every action the type exposes.
///
/// ```rust
/// use brrtrouter_controller::controller::{Action, ControllerClass, ControllerDescriptor, ParamKind};
/// use brrtrouter_controller::Controller;
/// use serde_json::json;
///
/// struct Greeter;
/// impl Controller for Greeter {}
///
/// impl ControllerClass for Greeter {
///     fn describe() -> ControllerDescriptor<Self> {
///         ControllerDescriptor::new(|| Ok(Greeter)).path("/greet").action(
///             Action::new("hello", |_c: &mut Greeter, _ctx, args| {
///                 let name: String = args.parse(0)?;
///                 Ok(Some(json!({ "greeting": format!("hello {name}") })))
///             })
///             .param("name", ParamKind::String)
///             .get("/{name}"),
///         )
///     }
/// }
///
/// let greeter = Greeter::controller_type();
/// assert_eq!(greeter.name(), "Greeter");
/// ```
pub trait ControllerClass: Controller + Sized {
    /// Constructor, package, path prefix and actions of this type.
    fn describe() -> ControllerDescriptor<Self>;

    /// Type-erased handle used for registration
    #[must_use]
    fn controller_type() -> ControllerType {
        ControllerType::of::<Self>()
    }
}

/// Signature every action has once bound to its controller type.
pub type ActionFn<C> =
    Arc<dyn Fn(&mut C, &mut RequestContext, &Arguments) -> anyhow::Result<Option<Value>> + Send + Sync>;

type ErasedActionFn = Arc<
    dyn Fn(&mut (dyn Any + Send), &mut RequestContext, &Arguments) -> anyhow::Result<Option<Value>>
        + Send
        + Sync,
>;

type Constructor = Box<dyn Fn() -> anyhow::Result<Box<dyn Any + Send>> + Send + Sync>;

/// Route annotation on an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRoute {
    pub verb: HttpVerb,
    pub uri_pattern: String,
}

/// Metadata of an action: name, parameters, route annotations
#[derive(Debug, Clone)]
pub struct ActionMeta {
    name: Arc<str>,
    parameters: Vec<ParameterDescriptor>,
    routes: Vec<ActionRoute>,
}

impl ActionMeta {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    #[must_use]
    pub fn routes(&self) -> &[ActionRoute] {
        &self.routes
    }

    /// Actions with at least one route annotation are picked up by scanning
    #[must_use]
    pub fn is_routable(&self) -> bool {
        !self.routes.is_empty()
    }
}

/// Builder for one action of controller `C`
pub struct Action<C> {
    meta: ActionMeta,
    invoke: ActionFn<C>,
}

impl<C: Controller> Action<C> {
    pub fn new<F>(name: &str, invoke: F) -> Self
    where
        F: Fn(&mut C, &mut RequestContext, &Arguments) -> anyhow::Result<Option<Value>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            meta: ActionMeta {
                name: Arc::from(name),
                parameters: Vec::new(),
                routes: Vec::new(),
            },
            invoke: Arc::new(invoke),
        }
    }

    /// Append a required parameter with no source hint
    #[must_use]
    pub fn param(self, name: &str, kind: ParamKind) -> Self {
        self.parameter(ParameterDescriptor::new(name, kind))
    }

    /// Append a fully described parameter; its index is its position
    #[must_use]
    pub fn parameter(mut self, descriptor: ParameterDescriptor) -> Self {
        let index = self.meta.parameters.len();
        self.meta.parameters.push(descriptor.at(index));
        self
    }

    #[must_use]
    pub fn route(mut self, verb: HttpVerb, uri_pattern: &str) -> Self {
        self.meta.routes.push(ActionRoute {
            verb,
            uri_pattern: uri_pattern.to_string(),
        });
        self
    }

    #[must_use]
    pub fn get(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::Get, uri_pattern)
    }

    #[must_use]
    pub fn post(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::Post, uri_pattern)
    }

    #[must_use]
    pub fn put(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::Put, uri_pattern)
    }

    #[must_use]
    pub fn delete(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::Delete, uri_pattern)
    }

    #[must_use]
    pub fn patch(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::Patch, uri_pattern)
    }

    #[must_use]
    pub fn head(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::Head, uri_pattern)
    }

    #[must_use]
    pub fn all(self, uri_pattern: &str) -> Self {
        self.route(HttpVerb::All, uri_pattern)
    }

    fn erase(self) -> ErasedAction {
        let invoke = self.invoke;
        let erased: ErasedActionFn = Arc::new(
            move |instance: &mut (dyn Any + Send),
                  ctx: &mut RequestContext,
                  args: &Arguments|
                  -> anyhow::Result<Option<Value>> {
                let controller = instance.downcast_mut::<C>().ok_or_else(|| {
                    anyhow::anyhow!("controller instance is not a {}", std::any::type_name::<C>())
                })?;
                invoke(controller, ctx, args)
            },
        );
        ErasedAction {
            meta: Arc::new(self.meta),
            invoke: erased,
        }
    }
}

/// Everything a controller type declares about itself
pub struct ControllerDescriptor<C> {
    name: String,
    package: String,
    path: String,
    constructor: Box<dyn Fn() -> anyhow::Result<C> + Send + Sync>,
    actions: Vec<Action<C>>,
}

impl<C: Controller> ControllerDescriptor<C> {
    /// Name and package default to the last segment and the module path of
    /// `C`'s type name.
    pub fn new<F>(constructor: F) -> Self
    where
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        let (package, name) = split_type_name(std::any::type_name::<C>());
        Self {
            name: name.to_string(),
            package: package.to_string(),
            path: String::new(),
            constructor: Box::new(constructor),
            actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Package the type is scanned under (`app.web` and `app::web` are equivalent)
    #[must_use]
    pub fn package(mut self, package: &str) -> Self {
        self.package = normalize_package(package);
        self
    }

    /// Prefix joined with every action route pattern
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action<C>) -> Self {
        self.actions.push(action);
        self
    }
}

struct ErasedAction {
    meta: Arc<ActionMeta>,
    invoke: ErasedActionFn,
}

struct ControllerTypeInner {
    name: String,
    package: String,
    path: String,
    type_id: TypeId,
    type_name: &'static str,
    constructor: Constructor,
    as_controller: fn(&mut (dyn Any + Send)) -> Option<&mut dyn Controller>,
    actions: Vec<ErasedAction>,
}

/// Type-erased controller "class": name, package, constructor, action table.
///
/// Cheap to clone; clones share the same descriptor.
#[derive(Clone)]
pub struct ControllerType {
    inner: Arc<ControllerTypeInner>,
}

fn cast_controller<C: Controller>(instance: &mut (dyn Any + Send)) -> Option<&mut dyn Controller> {
    instance
        .downcast_mut::<C>()
        .map(|controller| controller as &mut dyn Controller)
}

impl ControllerType {
    #[must_use]
    pub fn of<C: ControllerClass>() -> Self {
        let descriptor = C::describe();
        let constructor = descriptor.constructor;
        let erased_constructor: Constructor = Box::new(move || {
            let instance = constructor()?;
            Ok(Box::new(instance) as Box<dyn Any + Send>)
        });

        Self {
            inner: Arc::new(ControllerTypeInner {
                name: descriptor.name,
                package: descriptor.package,
                path: descriptor.path,
                type_id: TypeId::of::<C>(),
                type_name: std::any::type_name::<C>(),
                constructor: erased_constructor,
                as_controller: cast_controller::<C>,
                actions: descriptor.actions.into_iter().map(Action::erase).collect(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Normalized package (`::`-separated)
    #[must_use]
    pub fn package(&self) -> &str {
        &self.inner.package
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.inner.type_id
    }

    /// Whether this descriptor belongs to the Rust type `C`
    #[must_use]
    pub fn is<C: 'static>(&self) -> bool {
        self.inner.type_id == TypeId::of::<C>()
    }

    /// Whether the type lives in `package` or one of its sub-packages
    #[must_use]
    pub fn in_package(&self, package: &str) -> bool {
        let package = normalize_package(package);
        let own = self.package();
        own == package
            || (own.starts_with(package.as_str()) && own[package.len()..].starts_with("::"))
    }

    pub fn actions(&self) -> impl Iterator<Item = &ActionMeta> {
        self.inner.actions.iter().map(|a| a.meta.as_ref())
    }

    /// Build a new instance with the type's own constructor.
    pub fn construct(&self) -> anyhow::Result<Box<dyn Any + Send>> {
        (self.inner.constructor)()
    }

    /// View an instance as a [`Controller`]; `None` if it is not of this type.
    pub fn as_controller<'a>(&self, instance: &'a mut (dyn Any + Send)) -> Option<&'a mut dyn Controller> {
        (self.inner.as_controller)(instance)
    }

    /// Resolve `action` to exactly one action of this type.
    ///
    /// Overloads (several actions with the same name) are rejected here so the
    /// ambiguity never reaches request time.
    pub fn resolve(&self, action: &str) -> Result<ControllerMethod, ConfigurationError> {
        let mut matches = self.inner.actions.iter().filter(|a| a.meta.name() == action);
        let first = matches.next().ok_or_else(|| ConfigurationError::UnknownAction {
            controller: self.name().to_string(),
            action: action.to_string(),
        })?;
        let others = matches.count();
        if others > 0 {
            return Err(ConfigurationError::AmbiguousAction {
                controller: self.name().to_string(),
                action: action.to_string(),
                overloads: others + 1,
            });
        }

        Ok(ControllerMethod {
            controller_type: self.clone(),
            action: Arc::clone(&first.meta),
            invoke: Arc::clone(&first.invoke),
        })
    }
}

impl fmt::Debug for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerType")
            .field("name", &self.inner.name)
            .field("package", &self.inner.package)
            .field("path", &self.inner.path)
            .field("actions", &self.inner.actions.len())
            .finish()
    }
}

/// A `(controller type, action)` pair resolved at registration time.
#[derive(Clone)]
pub struct ControllerMethod {
    controller_type: ControllerType,
    action: Arc<ActionMeta>,
    invoke: ErasedActionFn,
}

impl ControllerMethod {
    #[must_use]
    pub fn controller_type(&self) -> &ControllerType {
        &self.controller_type
    }

    #[must_use]
    pub fn controller_name(&self) -> &str {
        self.controller_type.name()
    }

    #[must_use]
    pub fn action(&self) -> &ActionMeta {
        &self.action
    }

    #[must_use]
    pub fn action_name(&self) -> &str {
        self.action.name()
    }

    /// Call the action on `instance`.
    pub fn invoke(
        &self,
        instance: &mut (dyn Any + Send),
        ctx: &mut RequestContext,
        args: &Arguments,
    ) -> anyhow::Result<Option<Value>> {
        (self.invoke)(instance, ctx, args)
    }
}

impl fmt::Debug for ControllerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.controller_name(), self.action_name())
    }
}

/// `app.web` → `app::web`
pub(crate) fn normalize_package(package: &str) -> String {
    package.trim().replace('.', "::")
}

fn split_type_name(type_name: &str) -> (&str, &str) {
    // Generic arguments may contain `::`; only split the outer path.
    let outer = type_name.split('<').next().unwrap_or(type_name);
    match outer.rsplit_once("::") {
        Some((package, name)) => (package, name),
        None => ("", outer),
    }
}
