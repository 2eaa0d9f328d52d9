//! Invoker configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional file,
//! then `INVOKER_`-prefixed environment variables using `__` as the nesting
//! separator (`INVOKER_FUNCTION__DEFINITION=uppercase`).
//!
//! The layered sources lowercase every table key. Header names and function
//! names in `function.configuration` are case-sensitive, so that section is
//! read a second time straight from a `.toml` or `.json` file and replaces the
//! lowercased entries.

use crate::drain::DrainLimits;
use function_context::{FunctionConfiguration, FunctionProperties};
use function_types::{FunctionError, FunctionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "INVOKER";

/// Complete invoker configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Function to serve and its header mapping expressions
    #[serde(default)]
    pub function: FunctionProperties,

    /// Stream drainage bounds
    #[serde(default)]
    pub drain: DrainLimits,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// The part of a configuration file whose keys must keep their case
#[derive(Debug, Default, Deserialize)]
struct FunctionSection {
    #[serde(default)]
    function: Option<ConfigurationSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigurationSection {
    #[serde(default)]
    configuration: BTreeMap<String, FunctionConfiguration>,
}

impl InvokerConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&str>) -> FunctionResult<Self> {
        let mut config =
            Self::build(path).map_err(|e| FunctionError::Configuration(e.to_string()))?;

        if let Some(path) = path {
            for (key, function) in read_function_configuration(Path::new(path))? {
                config.function.set_configuration(key, function);
            }
        }

        Ok(config)
    }

    fn build(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&InvokerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

/// Read `function.configuration` from `path` without touching key case.
///
/// Files in other formats, or missing files, contribute nothing.
fn read_function_configuration(
    path: &Path,
) -> FunctionResult<BTreeMap<String, FunctionConfiguration>> {
    let format = path.extension().and_then(|ext| ext.to_str());
    if !matches!(format, Some("toml") | Some("json")) || !path.is_file() {
        return Ok(BTreeMap::new());
    }

    let contents = std::fs::read_to_string(path)?;
    let section: FunctionSection = match format {
        Some("json") => serde_json::from_str(&contents)
            .map_err(|e| FunctionError::Configuration(e.to_string()))?,
        _ => toml::from_str(&contents).map_err(|e| FunctionError::Configuration(e.to_string()))?,
    };

    Ok(section
        .function
        .map(|function| function.configuration)
        .unwrap_or_default())
}
