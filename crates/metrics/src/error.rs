//! Metrics error types

use thiserror::Error;

/// Result type for metrics operations
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised while building the registry
///
/// Recording never fails; these only surface at startup.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A Prometheus collector could not be created or registered
    #[error("failed to register metric '{name}': {source}")]
    Registration {
        name: String,
        #[source]
        source: prometheus::Error,
    },

    /// The Prometheus text encoder failed
    #[error("failed to encode metrics: {0}")]
    Encode(#[source] prometheus::Error),
}

impl MetricsError {
    /// Create a Registration error
    pub fn registration(name: impl Into<String>, source: prometheus::Error) -> Self {
        Self::Registration {
            name: name.into(),
            source,
        }
    }
}
