use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Declared type of an action parameter.
///
/// Extractors produce raw strings for most sources; [`ParamKind::coerce`]
/// turns them into JSON values of the declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Arbitrary JSON, parsed from the raw value when possible
    Json,
    /// Comma-separated or repeated values
    List,
}

impl ParamKind {
    /// Empty value bound for absent parameters
    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            ParamKind::String => Value::String(String::new()),
            ParamKind::Integer => Value::from(0i64),
            ParamKind::Float => Value::from(0.0f64),
            ParamKind::Boolean => Value::Bool(false),
            ParamKind::Json => Value::Null,
            ParamKind::List => Value::Array(Vec::new()),
        }
    }

    /// Convert a raw request value; `Err` carries the expected kind name.
    pub fn coerce(self, raw: &str) -> Result<Value, &'static str> {
        match self {
            ParamKind::String => Ok(Value::String(raw.to_string())),
            ParamKind::Integer => raw.trim().parse::<i64>().map(Value::from).map_err(|_| self.name()),
            ParamKind::Float => raw.trim().parse::<f64>().map(Value::from).map_err(|_| self.name()),
            ParamKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(Value::Bool(false)),
                _ => Err(self.name()),
            },
            ParamKind::Json => {
                Ok(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
            ParamKind::List => Ok(Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            )),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Float => "float",
            ParamKind::Boolean => "boolean",
            ParamKind::Json => "json",
            ParamKind::List => "list",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a parameter's value is expected to come from.
///
/// Extractors decide applicability from this hint. `Any` is the unannotated
/// case: the built-in request-parameter extractor looks at the path first,
/// then the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamSource {
    Any,
    Path,
    Query,
    Header,
    Cookie,
    Body,
    /// Request attribute set by a listener
    Attribute,
    /// Application-defined source, claimed by a custom extractor
    Custom(&'static str),
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamSource::Any => write!(f, "any"),
            ParamSource::Path => write!(f, "path"),
            ParamSource::Query => write!(f, "query"),
            ParamSource::Header => write!(f, "header"),
            ParamSource::Cookie => write!(f, "cookie"),
            ParamSource::Body => write!(f, "body"),
            ParamSource::Attribute => write!(f, "attribute"),
            ParamSource::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

/// Formal parameter of an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    name: Arc<str>,
    index: usize,
    kind: ParamKind,
    source: ParamSource,
    required: bool,
}

impl ParameterDescriptor {
    /// Required parameter of `kind` with no source hint.
    #[must_use]
    pub fn new(name: &str, kind: ParamKind) -> Self {
        Self {
            name: Arc::from(name),
            index: 0,
            kind,
            source: ParamSource::Any,
            required: true,
        }
    }

    #[must_use]
    pub fn source(mut self, source: ParamSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub(crate) fn at(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the action's parameter list
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    #[must_use]
    pub fn param_source(&self) -> ParamSource {
        self.source
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Resolved argument list handed to an action, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    names: Vec<Arc<str>>,
    values: Vec<Value>,
}

impl Arguments {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            names: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: Arc<str>, value: Value) {
        self.names.push(name);
        self.values.push(value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n.as_ref() == name)
            .and_then(|i| self.values.get(i))
    }

    /// Deserialize the argument at `index` into `T`.
    pub fn parse<T: DeserializeOwned>(&self, index: usize) -> anyhow::Result<T> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("no argument at position {index}"))?;
        let name = self.names.get(index).map(|n| &**n).unwrap_or("?");
        serde_json::from_value(value.clone())
            .with_context(|| format!("argument '{name}' has an unexpected type"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_kinds() {
        assert_eq!(ParamKind::Integer.coerce(" 42 "), Ok(json!(42)));
        assert_eq!(ParamKind::Integer.coerce("4x"), Err("integer"));
        assert_eq!(ParamKind::Boolean.coerce("on"), Ok(json!(true)));
        assert_eq!(ParamKind::Float.coerce("1.5"), Ok(json!(1.5)));
        assert_eq!(ParamKind::List.coerce("a, b,,c"), Ok(json!(["a", "b", "c"])));
        assert_eq!(ParamKind::Json.coerce("{\"a\":1}"), Ok(json!({"a": 1})));
        assert_eq!(ParamKind::Json.coerce("plain"), Ok(json!("plain")));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(ParamKind::String.default_value(), json!(""));
        assert_eq!(ParamKind::Integer.default_value(), json!(0));
        assert_eq!(ParamKind::Boolean.default_value(), json!(false));
        assert_eq!(ParamKind::List.default_value(), json!([]));
        assert_eq!(ParamKind::Json.default_value(), Value::Null);
    }

    #[test]
    fn test_arguments_parse_and_lookup() {
        let mut args = Arguments::with_capacity(2);
        args.push(Arc::from("id"), json!(7));
        args.push(Arc::from("name"), json!("rex"));

        assert_eq!(args.len(), 2);
        assert_eq!(args.parse::<u32>(0).unwrap(), 7);
        assert_eq!(args.parse::<String>(1).unwrap(), "rex");
        assert_eq!(args.by_name("name"), Some(&json!("rex")));
        assert!(args.parse::<String>(0).is_err());
        assert!(args.parse::<String>(5).is_err());
    }
}
