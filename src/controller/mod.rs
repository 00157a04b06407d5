//! # Controller Module
//!
//! Controllers are the objects that carry action methods. Rust has no runtime
//! reflection, so a controller type describes itself through
//! [`ControllerClass::describe`]: its constructor, its package and path
//! prefix, and every action with its parameters and route annotations.
//!
//! The description is erased into a [`ControllerType`], which is what the
//! registry scans and what the route handler factory binds. Resolving an
//! action name to a [`ControllerMethod`] happens once, at registration; an
//! ambiguous name fails there instead of at request time.
//!
//! Instances are produced per dispatch by a [`ControllerFactory`]. The default
//! factory uses the declared constructor; applications plug in their own to
//! build controllers from an object graph.

mod core;
mod factory;
mod params;

pub use self::core::{
    Action, ActionFn, ActionMeta, ActionRoute, Controller, ControllerClass, ControllerDescriptor,
    ControllerMethod, ControllerType,
};
pub(crate) use self::core::normalize_package;
pub use factory::{ControllerFactory, DefaultControllerFactory};
pub use params::{Arguments, ParamKind, ParamSource, ParameterDescriptor};
