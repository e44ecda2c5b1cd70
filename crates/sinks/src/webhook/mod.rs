//! Generic Webhook Sink
//!
//! POSTs the event JSON unchanged to `address`. Entries in `custom_headers`
//! are installed on the transport once, so every request carries them
//! alongside the base headers.

use async_trait::async_trait;
use bytes::Bytes;
use herald_config::{TlsConfig, WebhookSinkConfig};
use herald_metrics::{MetricsRegistry, SinkRecorder};
use herald_protocol::{Event, Priority};

use crate::error::{BuildError, SinkError, TransportError};
use crate::sink::Sink;
use crate::transport::HttpTransport;

/// Plain JSON webhook
pub struct WebhookSink {
    name: String,
    minimum_priority: Priority,
    transport: HttpTransport,
    recorder: SinkRecorder,
}

impl WebhookSink {
    /// Build the sink from its configuration table
    pub fn from_config(
        name: &str,
        config: &WebhookSinkConfig,
        tls: &TlsConfig,
        registry: &MetricsRegistry,
    ) -> Result<Self, SinkError> {
        if config.address.is_empty() {
            return Err(SinkError::config(name, "address is required"));
        }

        let transport = HttpTransport::new(name, &config.address, &config.delivery, tls)?;
        for (header, value) in &config.custom_headers {
            transport.set_header(header, value)?;
        }

        Ok(Self {
            name: name.to_owned(),
            minimum_priority: config.delivery.minimum_priority,
            transport,
            recorder: registry.sink_recorder(name),
        })
    }
}

#[async_trait]
impl Sink for WebhookSink {
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
        self.transport.send(payload, &[]).await?;
        Ok("Post OK".into())
    }
}
