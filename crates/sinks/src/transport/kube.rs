//! Kubernetes service-proxy transport
//!
//! Posts through the API server's service proxy instead of reaching the
//! service directly, for deployments that run outside the cluster:
//!
//! ```text
//! POST /api/v1/namespaces/{ns}/services/{service}:{port}/proxy/{path}
//! ```
//!
//! Base headers match `HttpTransport`; failures, including exceeding the
//! sink timeout, surface as `TransportError::Cluster`.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, USER_AGENT};
use kube::config::{KubeConfigOptions, Kubeconfig};
use uuid::Uuid;

use super::http::{DEFAULT_CONTENT_TYPE, USER_AGENT_VALUE};
use crate::error::TransportError;

/// Service reached through the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProxyTarget {
    pub namespace: String,
    pub service: String,
    pub port: u16,
    /// Path below the service root, without a leading slash
    pub path: String,
}

impl ServiceProxyTarget {
    /// API server path for this target
    pub fn proxy_path(&self) -> String {
        format!(
            "/api/v1/namespaces/{}/services/{}:{}/proxy/{}",
            self.namespace,
            self.service,
            self.port,
            self.path.trim_start_matches('/')
        )
    }
}

/// Cluster control-plane client bound to one sink and one proxied service
pub struct KubeProxyTransport {
    sink: String,
    client: kube::Client,
    path: String,
    correlation_header: String,
    timeout: Option<Duration>,
}

impl KubeProxyTransport {
    /// Wrap an existing client
    pub fn new(sink: &str, client: kube::Client, target: &ServiceProxyTarget) -> Self {
        Self {
            sink: sink.to_owned(),
            client,
            path: target.proxy_path(),
            correlation_header: "X-Correlation-ID".into(),
            timeout: None,
        }
    }

    /// Build a client from a kubeconfig file (current context)
    ///
    /// `timeout` bounds connect, read and the whole proxied call.
    pub async fn from_kubeconfig(
        sink: &str,
        kubeconfig: &Path,
        target: &ServiceProxyTarget,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let raw = Kubeconfig::read_from(kubeconfig).map_err(|e| {
            TransportError::init(
                sink,
                format!("failed to read kubeconfig '{}': {e}", kubeconfig.display()),
            )
        })?;
        let mut config = kube::Config::from_custom_kubeconfig(raw, &KubeConfigOptions::default())
            .await
            .map_err(|e| TransportError::init(sink, format!("invalid kubeconfig: {e}")))?;
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        let client = kube::Client::try_from(config)
            .map_err(|e| TransportError::init(sink, format!("kubernetes client: {e}")))?;

        Ok(Self::new(sink, client, target).with_timeout(timeout))
    }

    /// Rename the correlation header
    #[must_use]
    pub fn with_correlation_header(mut self, name: impl Into<String>) -> Self {
        self.correlation_header = name.into();
        self
    }

    /// Fail a call that has not completed within `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// API server path requests are sent to
    pub fn path(&self) -> &str {
        &self.path
    }

    /// POST `payload` once through the proxy and return the response body
    pub async fn send(&self, payload: Bytes) -> Result<String, TransportError> {
        let request = http::Request::post(self.path.as_str())
            .header(CONTENT_TYPE, DEFAULT_CONTENT_TYPE)
            .header(self.correlation_header.as_str(), Uuid::new_v4().to_string())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(payload.to_vec())
            .map_err(|e| TransportError::cluster(&self.sink, e))?;

        let call = self.client.request_text(request);
        let result = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, call).await.map_err(|_| {
                TransportError::cluster(&self.sink, format!("timed out after {timeout:?}"))
            })?,
            None => call.await,
        };
        result.map_err(|e| TransportError::cluster(&self.sink, e))
    }
}

impl std::fmt::Debug for KubeProxyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeProxyTransport")
            .field("sink", &self.sink)
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
