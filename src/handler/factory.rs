use std::sync::Arc;

use tracing::debug;

use super::core::{ControllerRouteHandler, PipelineSlot, RouteHandler};
use crate::controller::ControllerType;
use crate::error::ConfigurationError;

/// Produces the route handler for a `(controller type, action)` pair.
///
/// Called at registration time. Implementations must resolve the action
/// eagerly so an unknown or overloaded name fails before serving starts.
pub trait RouteHandlerFactory: Send + Sync {
    fn create_handler(
        &self,
        controller_type: &ControllerType,
        action: &str,
        pipeline: &PipelineSlot,
    ) -> Result<Arc<dyn RouteHandler>, ConfigurationError>;
}

/// Binds a [`ControllerRouteHandler`] to the application's dispatch pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRouteHandlerFactory;

impl RouteHandlerFactory for DefaultRouteHandlerFactory {
    fn create_handler(
        &self,
        controller_type: &ControllerType,
        action: &str,
        pipeline: &PipelineSlot,
    ) -> Result<Arc<dyn RouteHandler>, ConfigurationError> {
        let method = controller_type.resolve(action)?;
        debug!(
            controller = %controller_type.name(),
            action = %action,
            parameters = method.action().parameters().len(),
            "Route handler created"
        );
        Ok(Arc::new(ControllerRouteHandler::new(method, pipeline.clone())))
    }
}
