// crates/core/src/error.rs
use thiserror::Error;

/// Errors that can occur when loading the dashboard configuration.
///
/// Every variant names the offending environment variable so a failed
/// startup can be fixed without reading the source.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable '{name}' is not set")]
    Missing { name: &'static str },

    #[error("Environment variable '{name}' must be set to either 'true' or 'false', received '{value}'")]
    InvalidBool { name: &'static str, value: String },

    #[error("Environment variable '{name}' must be an integer in the range 1-65535, received '{value}'")]
    InvalidPort { name: &'static str, value: String },

    #[error("Environment variable '{name}' is not a valid regular expression: {source}")]
    InvalidRegex {
        name: &'static str,
        #[source]
        source: regex_lite::Error,
    },
}

impl ConfigError {
    pub fn missing(name: &'static str) -> Self {
        Self::Missing { name }
    }

    pub fn invalid_bool(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidBool {
            name,
            value: value.into(),
        }
    }

    pub fn invalid_port(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidPort {
            name,
            value: value.into(),
        }
    }

    /// Name of the environment variable the error refers to.
    pub fn variable(&self) -> &'static str {
        match self {
            Self::Missing { name }
            | Self::InvalidBool { name, .. }
            | Self::InvalidPort { name, .. }
            | Self::InvalidRegex { name, .. } => name,
        }
    }
}
