//! Protocol error types
//!
//! Errors that can occur when decoding events at the ingestion boundary.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Priority string does not name a known severity
    #[error("unknown priority: {0:?}")]
    UnknownPriority(String),

    /// Event document is not valid JSON or misses required fields
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Create an unknown priority error
    #[inline]
    pub fn unknown_priority(value: impl Into<String>) -> Self {
        Self::UnknownPriority(value.into())
    }
}
