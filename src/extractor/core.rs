use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use super::builtin::default_extractors;
use crate::context::RequestContext;
use crate::controller::{ActionMeta, Arguments, ParameterDescriptor};
use crate::error::ExtractionError;
use crate::runtime_config::RequiredParameterPolicy;

/// Strategy that resolves one action parameter from the request.
pub trait MethodParameterExtractor: Send + Sync {
    /// Whether this extractor is responsible for `parameter`.
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool;

    /// Produce the value, or `None` when the request does not carry it.
    fn extract(
        &self,
        parameter: &ParameterDescriptor,
        ctx: &RequestContext,
    ) -> Result<Option<Value>, ExtractionError>;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered chain of extractors; the first applicable one wins.
///
/// An applicable extractor that finds nothing still wins: the parameter is
/// then absent and later extractors are not consulted. This lets specific
/// extractors sit in front of generic fallbacks without the action having to
/// disambiguate.
#[derive(Clone, Default)]
pub struct ExtractorChain {
    extractors: Vec<Arc<dyn MethodParameterExtractor>>,
}

impl ExtractorChain {
    /// Chain with no extractors
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Chain pre-populated with the built-in extractors
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            extractors: default_extractors(),
        }
    }

    /// Append an extractor after every existing one.
    pub fn add(&mut self, extractor: Arc<dyn MethodParameterExtractor>) -> &mut Self {
        self.extractors.push(extractor);
        self
    }

    pub fn extend<I>(&mut self, extractors: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn MethodParameterExtractor>>,
    {
        self.extractors.extend(extractors);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn MethodParameterExtractor> {
        self.extractors.iter().map(|e| e.as_ref())
    }

    /// Extractor names in chain order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|e| e.name()).collect()
    }

    /// Resolve a single parameter.
    ///
    /// Returns `Ok(None)` when no extractor is applicable or the applicable one
    /// found nothing.
    pub fn resolve(
        &self,
        parameter: &ParameterDescriptor,
        ctx: &RequestContext,
    ) -> Result<Option<Value>, ExtractionError> {
        match self.iter().find(|e| e.is_applicable(parameter)) {
            Some(extractor) => {
                let value = extractor.extract(parameter, ctx)?;
                trace!(
                    parameter = %parameter.name(),
                    extractor = extractor.name(),
                    resolved = value.is_some(),
                    "Parameter extracted"
                );
                Ok(value)
            }
            None => {
                debug!(
                    parameter = %parameter.name(),
                    source = %parameter.param_source(),
                    "No applicable extractor"
                );
                Ok(None)
            }
        }
    }

    /// Resolve every parameter of `action` in declaration order.
    ///
    /// Absent optional parameters bind their kind's empty value; absent
    /// required parameters follow `policy`.
    pub fn resolve_arguments(
        &self,
        action: &ActionMeta,
        ctx: &RequestContext,
        policy: RequiredParameterPolicy,
    ) -> Result<Arguments, ExtractionError> {
        let mut args = Arguments::with_capacity(action.parameters().len());
        for parameter in action.parameters() {
            let value = match self.resolve(parameter, ctx)? {
                Some(value) => value,
                None if parameter.is_required() && policy == RequiredParameterPolicy::Reject => {
                    return Err(ExtractionError::Unresolved {
                        parameter: parameter.name().to_string(),
                        index: parameter.index(),
                    });
                }
                None => parameter.kind().default_value(),
            };
            args.push(Arc::from(parameter.name()), value);
        }
        Ok(args)
    }
}

impl fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
