//! Microsoft Teams Sink
//!
//! Posts a legacy MessageCard to an incoming webhook.
//!
//! # Payload
//!
//! ```json
//! {
//!   "@type": "MessageCard",
//!   "summary": "<event output>",
//!   "themeColor": "ff9000",
//!   "sections": [{
//!     "activityTitle": "Herald",
//!     "activitySubtitle": "2024-05-01T12:30:00+00:00",
//!     "text": "<event output>",
//!     "facts": [{ "name": "rule", "value": "..." }]
//!   }]
//! }
//! ```
//!
//! `output_format` selects whether `text`, `facts` or both are filled.

use async_trait::async_trait;
use bytes::Bytes;
use herald_config::{OutputFormat, TeamsSinkConfig, TlsConfig};
use herald_metrics::{MetricsRegistry, SinkRecorder};
use herald_protocol::{Event, Priority};
use serde::Serialize;

use crate::error::{BuildError, SinkError, TransportError};
use crate::sink::Sink;
use crate::transport::HttpTransport;

/// Title shown on every card
pub const ACTIVITY_TITLE: &str = "Herald";

/// Card accent colour for a priority
pub const fn theme_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Emergency => "e20b0b",
        Priority::Alert => "ff5400",
        Priority::Critical => "ff9000",
        Priority::Error => "ffc700",
        Priority::Warning => "ffff00",
        Priority::Notice => "5bffb5",
        Priority::Informational => "68c2ff",
        Priority::Debug => "ccfff2",
    }
}

#[derive(Debug, Serialize)]
struct MessageCard<'a> {
    #[serde(rename = "@type")]
    card_type: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    summary: &'a str,
    #[serde(rename = "themeColor")]
    theme_color: &'static str,
    sections: [Section<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Section<'a> {
    #[serde(rename = "activityTitle")]
    activity_title: &'static str,
    #[serde(rename = "activitySubtitle")]
    activity_subtitle: String,
    #[serde(rename = "activityImage", skip_serializing_if = "Option::is_none")]
    activity_image: Option<&'a str>,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facts: Vec<Fact<'a>>,
}

#[derive(Debug, Serialize)]
struct Fact<'a> {
    name: &'a str,
    value: String,
}

/// Teams incoming-webhook sink
pub struct TeamsSink {
    name: String,
    minimum_priority: Priority,
    activity_image: Option<String>,
    output_format: OutputFormat,
    transport: HttpTransport,
    recorder: SinkRecorder,
}

impl TeamsSink {
    /// Build the sink from its configuration table
    pub fn from_config(
        name: &str,
        config: &TeamsSinkConfig,
        tls: &TlsConfig,
        registry: &MetricsRegistry,
    ) -> Result<Self, SinkError> {
        if config.webhook_url.is_empty() {
            return Err(SinkError::config(name, "webhook_url is required"));
        }
        let transport = HttpTransport::new(name, &config.webhook_url, &config.delivery, tls)?;

        Ok(Self {
            name: name.to_owned(),
            minimum_priority: config.delivery.minimum_priority,
            activity_image: Some(config.activity_image.clone()).filter(|s| !s.is_empty()),
            output_format: config.output_format,
            transport,
            recorder: registry.sink_recorder(name),
        })
    }

    /// Card document for `event`
    fn card<'a>(&'a self, event: &'a Event) -> MessageCard<'a> {
        let text = if self.output_format.includes_text() {
            event.output.as_str()
        } else {
            ""
        };
        let facts = if self.output_format.includes_facts() {
            facts(event)
        } else {
            Vec::new()
        };

        MessageCard {
            card_type: "MessageCard",
            summary: &event.output,
            theme_color: theme_color(event.priority),
            sections: [Section {
                activity_title: ACTIVITY_TITLE,
                activity_subtitle: event.time.to_rfc3339(),
                activity_image: self.activity_image.as_deref(),
                text,
                facts,
            }],
        }
    }
}

/// String-valued custom fields (by name), then the fixed event facts
fn facts(event: &Event) -> Vec<Fact<'_>> {
    let mut facts: Vec<Fact<'_>> = event
        .output_fields
        .iter()
        .filter_map(|(name, value)| {
            value.as_str().map(|v| Fact {
                name,
                value: v.to_owned(),
            })
        })
        .collect();

    facts.push(Fact {
        name: "rule",
        value: event.rule.clone(),
    });
    facts.push(Fact {
        name: "priority",
        value: event.priority.to_string(),
    });
    facts.push(Fact {
        name: "source",
        value: event.source.clone(),
    });
    if let Some(hostname) = event.hostname() {
        facts.push(Fact {
            name: "hostname",
            value: hostname.to_owned(),
        });
    }
    if !event.tags.is_empty() {
        facts.push(Fact {
            name: "tags",
            value: event.tags.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
        });
    }

    facts
}

#[async_trait]
impl Sink for TeamsSink {
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
        Ok(Bytes::from(serde_json::to_vec(&self.card(event))?))
    }

    async fn deliver(&self, payload: Bytes) -> Result<String, TransportError> {
        self.transport.send(payload, &[]).await?;
        Ok("Post OK".into())
    }
}
