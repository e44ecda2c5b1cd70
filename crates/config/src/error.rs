//! Startup failures of `herald.toml`

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Why Herald refused its configuration
///
/// Raised while loading and validating `herald.toml`, never once events flow.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML or does not match the schema
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// An enabled sink or section lacks a setting it cannot run without
    #[error("{component} '{name}' is missing required field '{field}'")]
    MissingField {
        /// Section kind: `sink`, `server` or `metrics`
        component: &'static str,
        /// Table name, e.g. `teams`
        name: String,
        field: &'static str,
    },

    /// A setting is present but unusable (bad URL, zero port, unknown level)
    #[error("{component} '{name}' has invalid {field}: {message}")]
    InvalidValue {
        component: &'static str,
        name: String,
        field: &'static str,
        /// What was wrong with the value
        message: String,
    },
}

impl ConfigError {
    pub fn missing_field(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
    ) -> Self {
        Self::MissingField {
            component,
            name: name.into(),
            field,
        }
    }

    pub fn invalid_value(
        component: &'static str,
        name: impl Into<String>,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            name: name.into(),
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_error() {
        let err = ConfigError::missing_field("sink", "teams_ops", "webhook_url");
        assert!(err.to_string().contains("sink"));
        assert!(err.to_string().contains("teams_ops"));
        assert!(err.to_string().contains("webhook_url"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("sink", "fission", "router_port", "must be non-zero");
        assert!(err.to_string().contains("fission"));
        assert!(err.to_string().contains("router_port"));
        assert!(err.to_string().contains("non-zero"));
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ConfigError::IoError {
            path: "/etc/herald.toml".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/etc/herald.toml"));
    }
}
