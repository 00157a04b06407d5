use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::controller::{ControllerFactory, ControllerMethod};
use crate::error::{DispatchError, InstantiationError};
use crate::extractor::ExtractorChain;
use crate::listener::{
    InitializationListenerList, InstantiationListenerList, InvokeListenerList, ListenerStage,
};
use crate::response::ResponseWriter;
use crate::runtime_config::RequiredParameterPolicy;

/// Unit installed in a route: handles one matched request.
pub trait RouteHandler: Send + Sync {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), DispatchError>;
}

impl<F> RouteHandler for F
where
    F: Fn(&mut RequestContext) -> Result<(), DispatchError> + Send + Sync,
{
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        self(ctx)
    }
}

/// Frozen serving-time collaborators of every controller route.
///
/// Built once when the application starts serving; nothing in it changes
/// afterwards, so it is shared across threads without locking.
pub struct DispatchPipeline {
    controller_factory: Arc<dyn ControllerFactory>,
    extractors: ExtractorChain,
    instantiation_listeners: InstantiationListenerList,
    initialization_listeners: InitializationListenerList,
    invoke_listeners: InvokeListenerList,
    response_writer: Arc<dyn ResponseWriter>,
    policy: RequiredParameterPolicy,
}

impl DispatchPipeline {
    pub(crate) fn new(
        controller_factory: Arc<dyn ControllerFactory>,
        extractors: ExtractorChain,
        instantiation_listeners: InstantiationListenerList,
        initialization_listeners: InitializationListenerList,
        invoke_listeners: InvokeListenerList,
        response_writer: Arc<dyn ResponseWriter>,
        policy: RequiredParameterPolicy,
    ) -> Self {
        Self {
            controller_factory,
            extractors,
            instantiation_listeners,
            initialization_listeners,
            invoke_listeners,
            response_writer,
            policy,
        }
    }

    #[must_use]
    pub fn extractors(&self) -> &ExtractorChain {
        &self.extractors
    }

    #[must_use]
    pub fn required_parameter_policy(&self) -> RequiredParameterPolicy {
        self.policy
    }

    /// Run one controller action against `ctx`.
    ///
    /// Stages run strictly in order and the first failure ends the dispatch:
    /// instantiate, instantiation listeners, `on_init`, initialization
    /// listeners, argument extraction, invoke listeners, the action, and
    /// finally the response writer when the action returned a value.
    pub fn dispatch(&self, method: &ControllerMethod, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        let controller_type = method.controller_type();
        let controller_name = controller_type.name();
        let action_name = method.action_name();
        let start = Instant::now();

        debug!(
            request_id = %ctx.request_id,
            controller = %controller_name,
            action = %action_name,
            factory = self.controller_factory.name(),
            "Controller dispatch started"
        );

        let mut instance = self
            .controller_factory
            .create(controller_type)
            .map_err(|err| {
                warn!(
                    request_id = %ctx.request_id,
                    controller = %controller_name,
                    error = %err,
                    "Controller instantiation failed"
                );
                DispatchError::Instantiation(err)
            })?;

        let controller = controller_type.as_controller(&mut *instance).ok_or_else(|| {
            DispatchError::Instantiation(InstantiationError::new(
                controller_name,
                anyhow::anyhow!(
                    "factory '{}' returned an instance that is not a {}",
                    self.controller_factory.name(),
                    controller_type.type_name()
                ),
            ))
        })?;

        let listener_error = |stage: ListenerStage, source: anyhow::Error| {
            warn!(
                controller = %controller_name,
                stage = %stage,
                error = %source,
                "Listener aborted dispatch"
            );
            DispatchError::Listener {
                stage,
                controller: controller_name.to_string(),
                source,
            }
        };

        for listener in self.instantiation_listeners.iter() {
            listener
                .on_instantiation(ctx, controller, method)
                .map_err(|e| listener_error(ListenerStage::Instantiation, e))?;
        }

        controller
            .on_init(ctx)
            .map_err(|source| DispatchError::Initialization {
                controller: controller_name.to_string(),
                source,
            })?;

        for listener in self.initialization_listeners.iter() {
            listener
                .on_initialization(ctx, controller, method)
                .map_err(|e| listener_error(ListenerStage::Initialization, e))?;
        }

        let args = self
            .extractors
            .resolve_arguments(method.action(), ctx, self.policy)
            .map_err(|source| {
                debug!(
                    request_id = %ctx.request_id,
                    controller = %controller_name,
                    action = %action_name,
                    parameter = %source.parameter(),
                    error = %source,
                    "Argument extraction failed"
                );
                DispatchError::Extraction {
                    controller: controller_name.to_string(),
                    action: action_name.to_string(),
                    source,
                }
            })?;

        for listener in self.invoke_listeners.iter() {
            listener
                .on_invoke(ctx, controller, method, &args)
                .map_err(|e| listener_error(ListenerStage::Invoke, e))?;
        }

        let value = method
            .invoke(&mut *instance, ctx, &args)
            .map_err(|source| DispatchError::Invocation {
                controller: controller_name.to_string(),
                action: action_name.to_string(),
                source,
            })?;

        match value {
            Some(value) => self
                .response_writer
                .write(ctx, value)
                .map_err(|source| DispatchError::Response { source })?,
            // The action wrote the response itself
            None => debug!(controller = %controller_name, action = %action_name, "Action returned no value"),
        }

        info!(
            request_id = %ctx.request_id,
            controller = %controller_name,
            action = %action_name,
            latency_us = start.elapsed().as_micros() as u64,
            "Controller action completed"
        );
        Ok(())
    }
}

impl fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("controller_factory", &self.controller_factory.name())
            .field("extractors", &self.extractors)
            .field("instantiation_listeners", &self.instantiation_listeners.len())
            .field("initialization_listeners", &self.initialization_listeners.len())
            .field("invoke_listeners", &self.invoke_listeners.len())
            .field("policy", &self.policy)
            .finish()
    }
}

/// Slot shared by every controller route handler of one application.
///
/// Empty while the application is being configured; filled exactly once
/// when it starts serving.
#[derive(Clone, Default)]
pub struct PipelineSlot(Arc<OnceCell<Arc<DispatchPipeline>>>);

impl PipelineSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<&Arc<DispatchPipeline>> {
        self.0.get()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.0.get().is_some()
    }

    /// Fill the slot. Only the owning application does this, once, as it is
    /// consumed.
    pub(crate) fn freeze(&self, pipeline: Arc<DispatchPipeline>) {
        self.0.get_or_init(|| pipeline);
    }
}

impl fmt::Debug for PipelineSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineSlot").field(&self.is_frozen()).finish()
    }
}

/// Route handler bound to one controller action.
#[derive(Debug, Clone)]
pub struct ControllerRouteHandler {
    method: ControllerMethod,
    pipeline: PipelineSlot,
}

impl ControllerRouteHandler {
    #[must_use]
    pub fn new(method: ControllerMethod, pipeline: PipelineSlot) -> Self {
        Self { method, pipeline }
    }

    #[must_use]
    pub fn method(&self) -> &ControllerMethod {
        &self.method
    }
}

impl RouteHandler for ControllerRouteHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        let pipeline = self.pipeline.get().ok_or_else(|| DispatchError::NotServing {
            controller: self.method.controller_name().to_string(),
            action: self.method.action_name().to_string(),
        })?;
        pipeline.dispatch(&self.method, ctx)
    }
}
