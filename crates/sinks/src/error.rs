//! Sink error types
//!
//! `BuildError` and `TransportError` are produced while dispatching and end
//! up as an Error outcome plus a log line. `SinkError` only appears while
//! sinks are being constructed.

use thiserror::Error;

/// Payload could not be rendered
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Delivery to the destination failed
///
/// Every variant carries the sink name so a log line is attributable on
/// its own.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Client could not be constructed (TLS material, header names, URL)
    #[error("sink '{sink}': failed to initialize transport: {message}")]
    Init { sink: String, message: String },

    /// Connect, TLS or timeout failure
    #[error("sink '{sink}': request failed: {source}")]
    Http {
        sink: String,
        #[source]
        source: reqwest::Error,
    },

    /// Destination answered with a non-2xx status
    #[error("sink '{sink}': unexpected status {status}: {body}")]
    Status {
        sink: String,
        status: u16,
        body: String,
    },

    /// Kubernetes API server proxy call failed
    #[error("sink '{sink}': cluster request failed: {message}")]
    Cluster { sink: String, message: String },
}

impl TransportError {
    /// Create an Init error
    pub fn init(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Init {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create an Http error
    pub fn http(sink: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            sink: sink.into(),
            source,
        }
    }

    /// Create a Cluster error
    pub fn cluster(sink: impl Into<String>, message: impl ToString) -> Self {
        Self::Cluster {
            sink: sink.into(),
            message: message.to_string(),
        }
    }

    /// Sink the failed request belonged to
    pub fn sink(&self) -> &str {
        match self {
            Self::Init { sink, .. }
            | Self::Http { sink, .. }
            | Self::Status { sink, .. }
            | Self::Cluster { sink, .. } => sink,
        }
    }
}

/// Failure of one dispatch attempt
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Sink construction errors
#[derive(Debug, Error)]
pub enum SinkError {
    /// Configuration cannot be turned into a working sink
    #[error("sink '{sink}': configuration error: {message}")]
    Config { sink: String, message: String },

    /// Transport could not be built
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SinkError {
    /// Create a Config error
    pub fn config(sink: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            sink: sink.into(),
            message: message.into(),
        }
    }
}
