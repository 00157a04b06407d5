//! Built-in extractors, assembled explicitly by [`default_extractors`].

use std::sync::Arc;

use serde_json::Value;

use super::core::MethodParameterExtractor;
use crate::context::RequestContext;
use crate::controller::{ParamKind, ParamSource, ParameterDescriptor};
use crate::error::ExtractionError;

/// The extractors every chain starts with, in order.
///
/// Source-specific extractors come first; [`ParamExtractor`] handles
/// parameters declared without a source.
#[must_use]
pub fn default_extractors() -> Vec<Arc<dyn MethodParameterExtractor>> {
    vec![
        Arc::new(PathExtractor),
        Arc::new(QueryExtractor),
        Arc::new(HeaderExtractor),
        Arc::new(CookieExtractor),
        Arc::new(BodyExtractor),
        Arc::new(AttributeExtractor),
        Arc::new(ParamExtractor),
    ]
}

fn coerce(parameter: &ParameterDescriptor, raw: &str) -> Result<Value, ExtractionError> {
    parameter
        .kind()
        .coerce(raw)
        .map_err(|expected| ExtractionError::InvalidValue {
            parameter: parameter.name().to_string(),
            value: raw.to_string(),
            expected,
        })
}

/// Accept an already-decoded JSON value only if it fits the declared kind.
///
/// Strings are raw values and go through [`coerce`] like any other source.
fn check_kind(parameter: &ParameterDescriptor, value: &Value) -> Result<Value, ExtractionError> {
    let kind = parameter.kind();
    if let Value::String(raw) = value {
        return coerce(parameter, raw);
    }
    let fits = match kind {
        ParamKind::Json => true,
        ParamKind::String => false,
        ParamKind::Integer => value.is_i64(),
        ParamKind::Float => value.is_number(),
        ParamKind::Boolean => value.is_boolean(),
        ParamKind::List => value.is_array(),
    };
    if fits {
        Ok(value.clone())
    } else {
        Err(ExtractionError::InvalidValue {
            parameter: parameter.name().to_string(),
            value: value.to_string(),
            expected: kind.name(),
        })
    }
}

fn coerce_all(parameter: &ParameterDescriptor, raws: &[&str]) -> Result<Option<Value>, ExtractionError> {
    match raws {
        [] => Ok(None),
        [single] => coerce(parameter, single).map(Some),
        many if parameter.kind() == ParamKind::List => {
            let mut items = Vec::new();
            for raw in many {
                if let Value::Array(values) = coerce(parameter, raw)? {
                    items.extend(values);
                }
            }
            Ok(Some(Value::Array(items)))
        }
        // Repeated scalar: last occurrence wins
        [.., last] => coerce(parameter, last).map(Some),
    }
}

/// Path parameters captured by the router
#[derive(Debug, Default, Clone, Copy)]
pub struct PathExtractor;

impl MethodParameterExtractor for PathExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Path
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        ctx.get_path_param(parameter.name())
            .map(|raw| coerce(parameter, raw))
            .transpose()
    }

    fn name(&self) -> &'static str {
        "path"
    }
}

/// Query string parameters; repeated keys bind as a list for list parameters
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryExtractor;

impl MethodParameterExtractor for QueryExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Query
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        coerce_all(parameter, &ctx.get_query_values(parameter.name()))
    }

    fn name(&self) -> &'static str {
        "query"
    }
}

/// Request headers; `user_agent` also matches `user-agent`
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderExtractor;

impl MethodParameterExtractor for HeaderExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Header
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        let name = parameter.name();
        let raw = ctx
            .get_header(name)
            .or_else(|| ctx.get_header(&name.replace('_', "-")));
        raw.map(|raw| coerce(parameter, raw)).transpose()
    }

    fn name(&self) -> &'static str {
        "header"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CookieExtractor;

impl MethodParameterExtractor for CookieExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Cookie
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        ctx.get_cookie(parameter.name())
            .map(|raw| coerce(parameter, raw))
            .transpose()
    }

    fn name(&self) -> &'static str {
        "cookie"
    }
}

/// The whole decoded request body, checked against the parameter kind
#[derive(Debug, Default, Clone, Copy)]
pub struct BodyExtractor;

impl MethodParameterExtractor for BodyExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Body
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        match &ctx.body {
            None | Some(Value::Null) => Ok(None),
            Some(body) => check_kind(parameter, body).map(Some),
        }
    }

    fn name(&self) -> &'static str {
        "body"
    }
}

/// Request attributes, typically set by an instantiation or initialization listener
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeExtractor;

impl MethodParameterExtractor for AttributeExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Attribute
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        ctx.attribute(parameter.name())
            .map(|value| check_kind(parameter, value))
            .transpose()
    }

    fn name(&self) -> &'static str {
        "attribute"
    }
}

/// Parameters declared without a source: path first, then query string.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParamExtractor;

impl MethodParameterExtractor for ParamExtractor {
    fn is_applicable(&self, parameter: &ParameterDescriptor) -> bool {
        parameter.param_source() == ParamSource::Any
    }

    fn extract(&self, parameter: &ParameterDescriptor, ctx: &RequestContext) -> Result<Option<Value>, ExtractionError> {
        if let Some(raw) = ctx.get_path_param(parameter.name()) {
            return coerce(parameter, raw).map(Some);
        }
        coerce_all(parameter, &ctx.get_query_values(parameter.name()))
    }

    fn name(&self) -> &'static str {
        "param"
    }
}
