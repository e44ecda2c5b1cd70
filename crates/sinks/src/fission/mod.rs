//! Fission Sink
//!
//! Invokes a Fission function with the event JSON as body.
//!
//! Two ways to reach the function router, chosen once at construction:
//!
//! | `kubeconfig` | Transport | Target |
//! |---|---|---|
//! | unset | `HttpTransport` | `http://{service}.{ns}.svc.cluster.local:{port}/fission-function/{fn}` |
//! | set | `KubeProxyTransport` | API server proxy to `{service}:{port}` |
//!
//! Both send an `event-id` correlation header and record outcomes the same way.

use async_trait::async_trait;
use bytes::Bytes;
use herald_config::{FissionSinkConfig, TlsConfig};
use herald_metrics::{MetricsRegistry, SinkRecorder};
use herald_protocol::{Event, Priority};
use tracing::debug;

use crate::error::{BuildError, SinkError, TransportError};
use crate::sink::Sink;
use crate::transport::{HttpTransport, KubeProxyTransport, ServiceProxyTarget};

/// Correlation header Fission functions read
pub const EVENT_ID_HEADER: &str = "event-id";

/// How the function router is reached
#[derive(Debug)]
pub enum FissionTransport {
    /// Direct in-cluster HTTP to the router service
    Gateway(HttpTransport),
    /// Through the Kubernetes API server's service proxy
    ClusterProxy(KubeProxyTransport),
}

/// Fission function invoker
pub struct FissionSink {
    name: String,
    function: String,
    minimum_priority: Priority,
    transport: FissionTransport,
    recorder: SinkRecorder,
}

impl FissionSink {
    /// Build the sink from its configuration table
    ///
    /// Async because the cluster proxy variant reads and resolves the
    /// kubeconfig.
    pub async fn from_config(
        name: &str,
        config: &FissionSinkConfig,
        tls: &TlsConfig,
        registry: &MetricsRegistry,
    ) -> Result<Self, SinkError> {
        if config.function.is_empty() {
            return Err(SinkError::config(name, "function is required"));
        }

        let transport = match config.kubeconfig {
            Some(ref kubeconfig) => {
                let proxy = KubeProxyTransport::from_kubeconfig(
                    name,
                    kubeconfig,
                    &proxy_target(config),
                    config.delivery.timeout,
                )
                .await?
                .with_correlation_header(EVENT_ID_HEADER);
                FissionTransport::ClusterProxy(proxy)
            }
            None => {
                let http = HttpTransport::new(name, &config.gateway_url(), &config.delivery, tls)?;
                http.set_correlation_header(EVENT_ID_HEADER)?;
                FissionTransport::Gateway(http)
            }
        };

        Ok(Self::with_transport(name, config, transport, registry))
    }

    /// Build the sink around an already constructed transport
    pub fn with_transport(
        name: &str,
        config: &FissionSinkConfig,
        transport: FissionTransport,
        registry: &MetricsRegistry,
    ) -> Self {
        Self {
            name: name.to_owned(),
            function: config.function.clone(),
            minimum_priority: config.delivery.minimum_priority,
            transport,
            recorder: registry.sink_recorder(name),
        }
    }

    /// Selected transport
    pub fn transport(&self) -> &FissionTransport {
        &self.transport
    }
}

/// Proxy target for the router service of `config`
pub fn proxy_target(config: &FissionSinkConfig) -> ServiceProxyTarget {
    ServiceProxyTarget {
        namespace: config.router_namespace.clone(),
        service: config.router_service.clone(),
        port: config.router_port,
        path: format!("fission-function/{}", config.function),
    }
}

#[async_trait]
impl Sink for FissionSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_priority(&self) -> Priority {
        self.minimum_priority
    }

    fn recorder(&self) -> &SinkRecorder {
        &self.recorder
    }

    fn build_payload(&self, event: &Event) -> Result<Bytes, BuildError> {
        Ok(Bytes::from(serde_json::to_vec(event)?))
    }

    async fn deliver(&self, payload: Bytes) -> Result<String, TransportError> {
        let response = match self.transport {
            FissionTransport::Gateway(ref http) => http.send(payload, &[]).await?,
            FissionTransport::ClusterProxy(ref proxy) => proxy.send(payload).await?,
        };
        debug!(
            sink = %self.name,
            function = %self.function,
            response = %response,
            "function response"
        );

        Ok(format!("Call Function \"{}\" OK", self.function))
    }
}
