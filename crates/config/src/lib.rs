//! Herald Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use herald_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str(
//!     "[sinks.webhook]\naddress = \"https://hooks.example.com/falco\"",
//! ).unwrap();
//! assert_eq!(config.enabled_sinks(), vec!["webhook"]);
//! ```
//!
//! # Example Minimal Config
//!
//! ```toml
//! [sinks.teams]
//! webhook_url = "https://outlook.office.com/webhook/abc"
//!
//! [sinks.fission]
//! function = "falco-handler"
//! ```
//!
//! Configuration is read once at startup. Every sink receives its own copy
//! of the section it needs and never looks at another sink's section.

mod error;
mod logging;
mod metrics;
mod server;
mod sinks;
mod tls;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricsConfig, StatsdConfig, StatsdFlavor};
pub use server::{DEFAULT_LISTEN, DEFAULT_MAX_BODY_SIZE, DEFAULT_SHUTDOWN_GRACE, ServerConfig};
pub use sinks::{
    DeliveryConfig, DeliveryMode, FissionSinkConfig, KNOWN_SINK_TYPES, OutputFormat, SinkConfig,
    SinksConfig, TeamsSinkConfig, WebhookSinkConfig,
};
pub use tls::TlsConfig;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Ingestion and introspection listener
    pub server: ServerConfig,

    /// Metrics naming and StatsD push
    pub metrics: MetricsConfig,

    /// Client identity for mutual TLS
    pub tls: TlsConfig,

    /// Output sinks (Teams, Fission, webhook)
    pub sinks: SinksConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Get list of enabled sink names, ordered by name
    pub fn enabled_sinks(&self) -> Vec<String> {
        self.sinks
            .iter()
            .filter(|(_, sink)| sink.is_enabled())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
