//! Pipeline error types

use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Dispatcher built without any sink
    #[error("no sinks configured")]
    NoSinks,

    /// A dispatch task ended without completing (panic or cancellation)
    #[error("dispatch task for sink '{sink}' failed: {message}")]
    TaskFailed { sink: String, message: String },
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
