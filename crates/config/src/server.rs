//! HTTP server configuration
//!
//! One listener serves event ingestion and the introspection endpoints.

use std::time::Duration;

use serde::Deserialize;

/// Default listen address
pub const DEFAULT_LISTEN: &str = "0.0.0.0:2801";

/// Default maximum accepted request body (1 MiB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Default wait for in-flight deliveries on shutdown
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Server configuration
///
/// ```toml
/// [server]
/// listen = "127.0.0.1:2801"
/// max_body_size = 65536
/// shutdown_grace = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (host:port)
    pub listen: String,

    /// Requests with larger bodies are rejected
    pub max_body_size: usize,

    /// How long shutdown waits for deliveries still in flight
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.into(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
