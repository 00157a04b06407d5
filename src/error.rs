//! Error taxonomy for controller registration and dispatch.
//!
//! Two families of errors exist:
//!
//! - [`ConfigurationError`] is raised while the application is being assembled
//!   (route registration, router swap, settings). It is fatal: startup aborts.
//! - [`DispatchError`] is raised while serving a single request. It terminates
//!   that dispatch only and is handed to the caller's error layer untouched.

use std::fmt;

use serde_json::json;

use crate::listener::ListenerStage;
use crate::response::HandlerResponse;
use crate::runtime_config::RuntimeMode;

/// Startup-time configuration error
///
/// Returned by every registration entry point of
/// [`ControllerApplication`](crate::application::ControllerApplication).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `set_router` was given a router without controller-aware metadata
    IncompatibleRouter {
        /// Capability the router must implement
        required: &'static str,
        /// Type name of the rejected router
        found: &'static str,
    },
    /// An action name resolves to more than one action on the controller
    AmbiguousAction {
        /// Controller name
        controller: String,
        /// Overloaded action name
        action: String,
        /// Number of actions sharing the name
        overloads: usize,
    },
    /// No action with the given name exists on the controller
    UnknownAction {
        /// Controller name
        controller: String,
        /// Requested action name
        action: String,
    },
    /// A package name that cannot be scanned
    InvalidPackageName {
        /// The rejected package name
        package: String,
    },
    /// A URI pattern the router cannot compile
    InvalidRoute {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },
    /// A configuration value that cannot be parsed
    InvalidSetting {
        /// Setting key (environment variable or YAML key)
        key: String,
        /// Raw value
        value: String,
        /// Accepted values
        expected: &'static str,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::IncompatibleRouter { required, found } => {
                write!(f, "'router' must be an instance of '{required}' (got '{found}')")
            }
            ConfigurationError::AmbiguousAction {
                controller,
                action,
                overloads,
            } => write!(
                f,
                "action '{action}' on controller '{controller}' is ambiguous: {overloads} actions share that name"
            ),
            ConfigurationError::UnknownAction { controller, action } => {
                write!(f, "controller '{controller}' has no action named '{action}'")
            }
            ConfigurationError::InvalidPackageName { package } => {
                write!(f, "cannot scan package '{package}': not a valid package name")
            }
            ConfigurationError::InvalidRoute { pattern, reason } => {
                write!(f, "invalid route pattern '{pattern}': {reason}")
            }
            ConfigurationError::InvalidSetting {
                key,
                value,
                expected,
            } => write!(f, "invalid value '{value}' for '{key}'. Must be {expected}."),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// The controller factory failed to produce an instance
#[derive(Debug)]
pub struct InstantiationError {
    controller: String,
    source: anyhow::Error,
}

impl InstantiationError {
    /// Wrap the constructor failure for `controller`
    pub fn new(controller: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            controller: controller.into(),
            source,
        }
    }

    /// Name of the controller that failed to instantiate
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// The original construction failure
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }
}

impl fmt::Display for InstantiationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to instantiate controller '{}': {}", self.controller, self.source)
    }
}

impl std::error::Error for InstantiationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// A method parameter could not be bound
#[derive(Debug)]
pub enum ExtractionError {
    /// Required parameter, no applicable extractor produced a value
    Unresolved {
        /// Parameter name
        parameter: String,
        /// Declaration index
        index: usize,
    },
    /// A raw value could not be converted to the declared kind
    InvalidValue {
        /// Parameter name
        parameter: String,
        /// Raw value as received
        value: String,
        /// Declared kind
        expected: &'static str,
    },
    /// An extractor itself failed
    Extractor {
        /// Parameter name
        parameter: String,
        /// Extractor that failed
        extractor: &'static str,
        /// Underlying failure
        source: anyhow::Error,
    },
}

impl ExtractionError {
    /// Name of the parameter that failed to bind
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            ExtractionError::Unresolved { parameter, .. }
            | ExtractionError::InvalidValue { parameter, .. }
            | ExtractionError::Extractor { parameter, .. } => parameter,
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionError::Unresolved { parameter, index } => write!(
                f,
                "required parameter '{parameter}' (#{index}) was not resolved by any extractor"
            ),
            ExtractionError::InvalidValue {
                parameter,
                value,
                expected,
            } => write!(
                f,
                "parameter '{parameter}': cannot convert '{value}' to {expected}"
            ),
            ExtractionError::Extractor {
                parameter,
                extractor,
                source,
            } => write!(
                f,
                "parameter '{parameter}': extractor '{extractor}' failed: {source}"
            ),
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExtractionError::Extractor { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// Terminal failure of a single dispatch
///
/// Nothing in the pipeline retries or recovers; side effects that already
/// happened (listeners fired, response headers set) are not rolled back.
#[derive(Debug)]
pub enum DispatchError {
    /// No route matched the request
    NoRoute {
        /// Request method
        method: String,
        /// Request path (without query string)
        path: String,
    },
    /// The route handler was invoked before the application started serving
    NotServing {
        /// Controller name
        controller: String,
        /// Action name
        action: String,
    },
    /// The controller factory failed
    Instantiation(InstantiationError),
    /// The controller's `on_init` hook failed
    Initialization {
        /// Controller name
        controller: String,
        /// Hook failure
        source: anyhow::Error,
    },
    /// A listener aborted the dispatch
    Listener {
        /// Sequence the listener belongs to
        stage: ListenerStage,
        /// Controller name
        controller: String,
        /// Listener failure
        source: anyhow::Error,
    },
    /// A parameter could not be bound; the action was not invoked
    Extraction {
        /// Controller name
        controller: String,
        /// Action name
        action: String,
        /// Extraction failure
        source: ExtractionError,
    },
    /// The action itself failed; see [`DispatchError::into_cause`]
    Invocation {
        /// Controller name
        controller: String,
        /// Action name
        action: String,
        /// Error returned by the action
        source: anyhow::Error,
    },
    /// The response writer rejected the action's return value
    Response {
        /// Writer failure
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// HTTP status the error layer should use by default
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::NoRoute { .. } => 404,
            DispatchError::Extraction { .. } => 400,
            DispatchError::NotServing { .. } => 503,
            _ => 500,
        }
    }

    /// Unwrap the error into its original cause.
    ///
    /// Invocation failures yield exactly the error the action returned,
    /// so callers can `downcast_ref` to their own error types.
    #[must_use]
    pub fn into_cause(self) -> anyhow::Error {
        match self {
            DispatchError::Invocation { source, .. } => source,
            other => anyhow::Error::new(other),
        }
    }

    /// Render the error as a JSON response.
    ///
    /// Dev mode exposes the full cause chain; prod only the status class.
    #[must_use]
    pub fn to_response(&self, mode: RuntimeMode) -> HandlerResponse {
        let status = self.status_code();
        let body = if mode.is_dev() {
            let mut chain = Vec::new();
            let mut cause = std::error::Error::source(self);
            while let Some(err) = cause {
                chain.push(err.to_string());
                cause = err.source();
            }
            json!({ "error": self.to_string(), "status": status, "causes": chain })
        } else {
            let message = match status {
                400 => "Bad Request",
                404 => "Not Found",
                503 => "Service Unavailable",
                _ => "Internal Server Error",
            };
            json!({ "error": message, "status": status })
        };
        HandlerResponse::json(status, body)
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::NoRoute { method, path } => {
                write!(f, "no route matches {method} {path}")
            }
            DispatchError::NotServing { controller, action } => write!(
                f,
                "route handler for {controller}.{action} invoked before the application started serving"
            ),
            DispatchError::Instantiation(err) => write!(f, "{err}"),
            DispatchError::Initialization { controller, source } => {
                write!(f, "controller '{controller}' failed to initialize: {source}")
            }
            DispatchError::Listener {
                stage,
                controller,
                source,
            } => write!(f, "{stage} listener aborted dispatch of '{controller}': {source}"),
            DispatchError::Extraction {
                controller,
                action,
                source,
            } => write!(f, "cannot bind arguments of {controller}.{action}: {source}"),
            DispatchError::Invocation {
                controller,
                action,
                source,
            } => write!(f, "{controller}.{action} failed: {source}"),
            DispatchError::Response { source } => write!(f, "failed to write response: {source}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Instantiation(err) => Some(err),
            DispatchError::Extraction { source, .. } => Some(source),
            DispatchError::Initialization { source, .. }
            | DispatchError::Listener { source, .. }
            | DispatchError::Invocation { source, .. }
            | DispatchError::Response { source } => Some(&**source),
            DispatchError::NoRoute { .. } | DispatchError::NotServing { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_router_names_capability() {
        let err = ConfigurationError::IncompatibleRouter {
            required: "ControllerRouter",
            found: "PatternRouter",
        };
        assert!(err.to_string().contains("'ControllerRouter'"));
    }

    #[test]
    fn test_into_cause_returns_action_error_unwrapped() {
        #[derive(Debug)]
        struct Teapot;
        impl fmt::Display for Teapot {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "teapot")
            }
        }
        impl std::error::Error for Teapot {}

        let err = DispatchError::Invocation {
            controller: "Kitchen".into(),
            action: "brew".into(),
            source: anyhow::Error::new(Teapot),
        };
        assert_eq!(err.status_code(), 500);
        let cause = err.into_cause();
        assert!(cause.downcast_ref::<Teapot>().is_some());
    }

    #[test]
    fn test_prod_response_hides_details() {
        let err = DispatchError::Extraction {
            controller: "Users".into(),
            action: "show".into(),
            source: ExtractionError::Unresolved {
                parameter: "id".into(),
                index: 0,
            },
        };
        let prod = err.to_response(RuntimeMode::Prod);
        assert_eq!(prod.status, 400);
        assert_eq!(prod.body["error"], "Bad Request");

        let dev = err.to_response(RuntimeMode::Dev);
        assert_eq!(dev.status, 400);
        let causes = dev.body["causes"].as_array().cloned().unwrap_or_default();
        assert_eq!(causes.len(), 1);
        assert!(causes[0].as_str().unwrap_or_default().contains("'id'"));
    }
}
