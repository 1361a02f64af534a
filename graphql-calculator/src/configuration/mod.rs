//! Logic for loading configuration in to an object model

use std::str::FromStr;

use displaydoc::Display;
use schemars::gen::SchemaSettings;
use schemars::schema::RootSchema;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;


/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
    /// could not deserialize configuration: {0}
    DeserializeConfigError(serde_yaml::Error),
}

/// The configuration of the calculator.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with the builder.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// Calculation history.
    #[serde(default)]
    pub history: History,

    /// Limits applied to incoming operations.
    #[serde(default)]
    pub limits: Limits,
}

#[buildstructor::buildstructor]
impl Configuration {
    #[builder]
    pub fn new(
        history: Option<History>,
        limits: Option<Limits>,
    ) -> Result<Self, ConfigurationError> {
        Self {
            history: history.unwrap_or_default(),
            limits: limits.unwrap_or_default(),
        }
        .validate()
    }

    /// Checks values serde cannot check on its own.
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if i32::try_from(self.history.default_limit).is_err() {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid history.default_limit",
                error: format!(
                    "{} does not fit in a GraphQL Int",
                    self.history.default_limit
                ),
            });
        }
        if self.history.capacity == Some(0) {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid history.capacity",
                error: "the capacity must be at least 1, remove it for an unbounded history"
                    .to_string(),
            });
        }
        if self.limits.max_depth == 0 {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid limits.max_depth",
                error: "the maximum depth must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

/// Parse configuration from a string in YAML syntax
impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // an empty document is the default configuration
        if s.trim().is_empty() {
            return Configuration::default().validate();
        }
        serde_yaml::from_str::<Configuration>(s)
            .map_err(ConfigurationError::DeserializeConfigError)?
            .validate()
    }
}

/// Calculation history configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct History {
    /// Number of records returned by `history` when no limit is given.
    pub default_limit: i64,

    /// Maximum number of records kept. The oldest records are evicted first. Unbounded when
    /// absent.
    pub capacity: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self {
            default_limit: 10,
            capacity: None,
        }
    }
}

/// Operation limits.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Maximum nesting of selection sets. Deeper operations are rejected.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    let settings = SchemaSettings::draft07().with(|s| {
        s.option_nullable = true;
        s.option_add_null_type = false;
        s.inline_subschemas = true;
    });

    let gen = settings.into_generator();
    gen.into_root_schema_for::<Configuration>()
}
