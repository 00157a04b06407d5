//! # Router Module
//!
//! Path matching and route resolution for controller-backed routes.
//!
//! ## Overview
//!
//! - [`Router`] is the generic capability: an ordered route table and
//!   request matching.
//! - [`ControllerRouter`] extends it with the `(controller, action)` binding
//!   of each route, lookups by binding and reverse URL generation.
//!
//! The controller application only accepts a [`ControllerRouter`]; handing
//! it a plain [`Router`] through `set_router` is a configuration error.
//!
//! ## Architecture
//!
//! Patterns such as `/pets/{id}` are compiled to anchored regexes when the
//! route is added, so a bad pattern fails at startup. Matching tests routes in
//! insertion order and the first hit wins; `ALL` routes answer any method.
//!
//! ```rust
//! use brrtrouter_controller::router::PatternRouter;
//!
//! let (regex, params) = PatternRouter::compile_pattern("/pets/{id}").unwrap();
//! assert!(regex.is_match("/pets/42"));
//! assert_eq!(params.len(), 1);
//! ```

mod controller;
mod core;

pub use self::core::{ControllerBinding, HttpVerb, PatternRouter, Route, RouteMatch, Router};
pub(crate) use controller::SharedRouter;
pub use controller::{expand_pattern, ControllerRouter, DefaultControllerRouter};
