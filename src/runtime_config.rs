//! # Runtime Configuration Module
//!
//! Settings that shape how controller routes are dispatched. They are read
//! once during startup, either from environment variables or from a YAML file,
//! and then threaded explicitly through
//! [`ControllerApplication`](crate::application::ControllerApplication).
//! There is no process-wide "current mode": whoever needs the mode is handed
//! the settings.
//!
//! ## Environment Variables
//!
//! ### `BRRTR_MODE`
//!
//! `dev` or `prod` (default: `prod`). Dev mode logs the full route table when
//! the application starts serving and renders error causes in responses.
//!
//! ### `BRRTR_REQUIRED_PARAMS`
//!
//! What to do when a required action parameter resolves to nothing:
//! - `reject` (default): fail the dispatch with an extraction error
//! - `default`: bind the parameter kind's empty value
//!
//! ### `BRRTR_LOG_ROUTES`
//!
//! `true` to log the route table on startup regardless of mode.
//!
//! ## YAML
//!
//! ```yaml
//! mode: dev
//! required_parameter_policy: default
//! log_routes: true
//! ```

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConfigurationError;

pub const MODE_ENV: &str = "BRRTR_MODE";
pub const REQUIRED_PARAMS_ENV: &str = "BRRTR_REQUIRED_PARAMS";
pub const LOG_ROUTES_ENV: &str = "BRRTR_LOG_ROUTES";

/// Runtime mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// Development
    Dev,
    /// Production
    #[default]
    Prod,
}

impl RuntimeMode {
    /// Look a mode up by its short name.
    pub fn by_name(name: &str) -> Result<Self, ConfigurationError> {
        match name {
            "dev" => Ok(RuntimeMode::Dev),
            "prod" => Ok(RuntimeMode::Prod),
            other => Err(ConfigurationError::InvalidSetting {
                key: MODE_ENV.to_string(),
                value: other.to_string(),
                expected: "'dev' or 'prod'",
            }),
        }
    }

    #[must_use]
    pub fn is_dev(self) -> bool {
        self == RuntimeMode::Dev
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeMode::Dev => write!(f, "dev"),
            RuntimeMode::Prod => write!(f, "prod"),
        }
    }
}

impl FromStr for RuntimeMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuntimeMode::by_name(s)
    }
}

/// Binding rule for a required parameter that no extractor resolved.
///
/// Optional parameters always bind their kind's empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequiredParameterPolicy {
    /// Fail the dispatch before the action runs
    #[default]
    Reject,
    /// Bind the empty value of the declared kind (`""`, `0`, `false`, ...)
    #[serde(alias = "default")]
    BindDefault,
}

impl FromStr for RequiredParameterPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(RequiredParameterPolicy::Reject),
            "default" | "bind-default" => Ok(RequiredParameterPolicy::BindDefault),
            other => Err(ConfigurationError::InvalidSetting {
                key: REQUIRED_PARAMS_ENV.to_string(),
                value: other.to_string(),
                expected: "'reject' or 'default'",
            }),
        }
    }
}

/// Settings of a controller application, immutable once serving starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Runtime mode (default: prod)
    pub mode: RuntimeMode,
    /// Required-but-unresolved parameter handling (default: reject)
    pub required_parameter_policy: RequiredParameterPolicy,
    /// Log every installed route at startup (always on in dev mode)
    pub log_routes: bool,
}

impl ControllerSettings {
    /// Load settings from `BRRTR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings from a variable source, e.g. a snapshot of the environment.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let mode = match lookup(MODE_ENV) {
            Some(value) => RuntimeMode::by_name(value.trim())?,
            None => RuntimeMode::default(),
        };
        let required_parameter_policy = match lookup(REQUIRED_PARAMS_ENV) {
            Some(value) => value.parse()?,
            None => RequiredParameterPolicy::default(),
        };
        let log_routes = match lookup(LOG_ROUTES_ENV) {
            Some(value) => value.trim().parse::<bool>().map_err(|_| ConfigurationError::InvalidSetting {
                key: LOG_ROUTES_ENV.to_string(),
                value,
                expected: "'true' or 'false'",
            })?,
            None => false,
        };

        Ok(Self {
            mode,
            required_parameter_policy,
            log_routes,
        })
    }

    /// Parse settings from a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse controller settings")
    }

    /// Read settings from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_yaml_str(&raw)
    }

    #[must_use]
    pub fn with_mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_required_parameter_policy(mut self, policy: RequiredParameterPolicy) -> Self {
        self.required_parameter_policy = policy;
        self
    }

    /// Whether the route table should be logged when serving starts
    #[must_use]
    pub fn should_log_routes(&self) -> bool {
        self.log_routes || self.mode.is_dev()
    }
}
