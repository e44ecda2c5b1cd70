//! Transports shared by the sinks
//!
//! - `HttpTransport`: direct HTTP POST (Teams, webhook, in-cluster Fission)
//! - `KubeProxyTransport`: POST through the Kubernetes API server proxy

pub mod http;
pub mod kube;

pub use self::http::{
    DEFAULT_CONTENT_TYPE, DEFAULT_CORRELATION_HEADER, HttpTransport, USER_AGENT_VALUE,
};
pub use self::kube::{KubeProxyTransport, ServiceProxyTarget};
