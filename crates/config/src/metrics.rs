//! Metrics configuration
//!
//! The local counter map and the Prometheus vector are always on; only the
//! external StatsD push needs an address.
//!
//! # Defaults
//!
//! - `prefix`: "herald"
//! - `statsd`: disabled (no section)

use serde::Deserialize;

/// Wire flavour for the StatsD push
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatsdFlavor {
    /// Plain StatsD: labels are folded into the metric name
    #[default]
    Statsd,
    /// DogStatsD: labels are sent as `|#key:value` tags
    Dogstatsd,
}

/// External StatsD collector
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StatsdConfig {
    /// Collector address (host:port, UDP)
    pub address: String,

    /// Line format
    #[serde(default)]
    pub flavor: StatsdFlavor,
}

/// Metrics configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// prefix = "herald"
///
/// [metrics.statsd]
/// address = "127.0.0.1:8125"
/// flavor = "dogstatsd"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Namespace for Prometheus metric names and StatsD keys
    /// Default: herald
    pub prefix: String,

    /// StatsD push target, disabled when absent
    pub statsd: Option<StatsdConfig>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: "herald".into(),
            statsd: None,
        }
    }
}
