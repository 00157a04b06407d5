//! # Handler Module
//!
//! Route handlers and the per-request dispatch pipeline.
//!
//! A [`RouteHandlerFactory`] turns a `(controller type, action)` pair into a
//! [`RouteHandler`] when routes are registered. Controller route handlers
//! share a [`PipelineSlot`] that stays empty while the application is being
//! configured; `ControllerApplication::into_service` freezes the controller
//! factory, extractor chain, listener lists and response writer into a
//! [`DispatchPipeline`] and fills the slot. A handler invoked before that
//! fails with `DispatchError::NotServing`.

mod core;
mod factory;

pub use self::core::{ControllerRouteHandler, DispatchPipeline, PipelineSlot, RouteHandler};
pub use factory::{DefaultRouteHandlerFactory, RouteHandlerFactory};
