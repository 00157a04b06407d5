use std::any::Any;

use tracing::debug;

use super::core::ControllerType;
use crate::error::InstantiationError;

/// Creates the controller instance for one dispatch.
///
/// Replace the default to build controllers from a dependency-injection
/// container or any other object graph. Implementations must return an
/// instance of exactly the requested type; the pipeline checks this and
/// reports a mismatch as an [`InstantiationError`].
pub trait ControllerFactory: Send + Sync {
    fn create(&self, controller_type: &ControllerType) -> Result<Box<dyn Any + Send>, InstantiationError>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Builds every instance with the type's declared constructor.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultControllerFactory;

impl ControllerFactory for DefaultControllerFactory {
    fn create(&self, controller_type: &ControllerType) -> Result<Box<dyn Any + Send>, InstantiationError> {
        debug!(controller = %controller_type.name(), "Constructing controller");
        controller_type
            .construct()
            .map_err(|source| InstantiationError::new(controller_type.name(), source))
    }
}
