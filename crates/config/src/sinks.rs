//! Sink configuration types
//!
//! Sinks are named instances, allowing several sinks of the same type
//! (e.g. one Teams channel per team, a staging and a production webhook).
//! Each sink reads only its own table; nothing here changes after load.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use herald_protocol::Priority;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// Known sink types, used for type inference from table names
pub const KNOWN_SINK_TYPES: &[&str] = &["teams", "fission", "webhook"];

/// Container for all sink configurations
///
/// The sink type is inferred from the table name when `type` is omitted:
/// `teams` / `teams_*` -> Teams, `fission` / `fission_*` -> Fission,
/// `webhook` / `webhook_*` -> Webhook.
///
/// # Example
///
/// ```toml
/// [sinks.teams]
/// webhook_url = "https://outlook.office.com/webhook/abc"
///
/// [sinks.teams_secops]
/// webhook_url = "https://outlook.office.com/webhook/def"
/// output_format = "facts"
///
/// [sinks.audit]
/// type = "webhook"
/// address = "https://audit.internal/falco"
/// ```
#[derive(Debug, Clone, Default)]
pub struct SinksConfig {
    sinks: BTreeMap<String, SinkConfig>,
}

impl SinksConfig {
    /// Get a sink by name
    pub fn get(&self, name: &str) -> Option<&SinkConfig> {
        self.sinks.get(name)
    }

    /// Check if a sink exists
    pub fn contains(&self, name: &str) -> bool {
        self.sinks.contains_key(name)
    }

    /// Iterate over all sinks, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SinkConfig)> {
        self.sinks.iter()
    }

    /// Get the number of configured sinks
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Check if no sinks are configured
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Add or replace a sink
    pub fn insert(&mut self, name: impl Into<String>, sink: SinkConfig) {
        self.sinks.insert(name.into(), sink);
    }
}

impl<'de> Deserialize<'de> for SinksConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, toml::Table>::deserialize(deserializer)?;

        let mut sinks = BTreeMap::new();
        for (name, mut table) in raw {
            if !table.contains_key("type") {
                let inferred = infer_sink_type(&name).ok_or_else(|| {
                    D::Error::custom(format!(
                        "sink '{name}' has no type and none can be inferred from its name \
                         (expected one of: {})",
                        KNOWN_SINK_TYPES.join(", ")
                    ))
                })?;
                table.insert("type".into(), toml::Value::String(inferred.into()));
            }

            let sink: SinkConfig = toml::Value::Table(table)
                .try_into()
                .map_err(|e| D::Error::custom(format!("sink '{name}': {e}")))?;
            sinks.insert(name, sink);
        }

        Ok(Self { sinks })
    }
}

/// Infer a sink type from its table name
fn infer_sink_type(name: &str) -> Option<&'static str> {
    KNOWN_SINK_TYPES.iter().copied().find(|ty| {
        name == *ty
            || name
                .strip_prefix(ty)
                .is_some_and(|rest| rest.starts_with('_'))
    })
}

/// Configuration for a single sink instance
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Microsoft Teams incoming webhook (MessageCard)
    Teams(TeamsSinkConfig),

    /// Fission function invocation
    Fission(FissionSinkConfig),

    /// Generic JSON webhook
    Webhook(WebhookSinkConfig),
}

impl SinkConfig {
    /// Delivery options shared by every sink type
    pub fn delivery(&self) -> &DeliveryConfig {
        match self {
            Self::Teams(c) => &c.delivery,
            Self::Fission(c) => &c.delivery,
            Self::Webhook(c) => &c.delivery,
        }
    }

    /// Check if the sink is enabled
    pub fn is_enabled(&self) -> bool {
        self.delivery().enabled
    }

    /// Get the sink type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Teams(_) => "teams",
            Self::Fission(_) => "fission",
            Self::Webhook(_) => "webhook",
        }
    }
}

// =============================================================================
// Shared delivery options
// =============================================================================

/// How concurrent deliveries to the same sink are scheduled
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Requests to this sink may be in flight concurrently
    #[default]
    Concurrent,
    /// One request at a time per sink, held for the full round trip
    Serialized,
}

/// Options every sink accepts (flattened into the sink table)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Whether this sink is enabled
    /// Default: true
    pub enabled: bool,

    /// Events below this priority are not sent to the sink
    /// Default: debug (everything)
    pub minimum_priority: Priority,

    /// Per-request timeout (connect + response)
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Validate the server certificate
    /// Default: true
    pub check_cert: bool,

    /// Present the client identity from `[tls]`
    /// Default: false
    pub mutual_tls: bool,

    /// Scheduling of concurrent deliveries
    /// Default: concurrent
    pub delivery: DeliveryMode,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_priority: Priority::Debug,
            timeout: Duration::from_secs(10),
            check_cert: true,
            mutual_tls: false,
            delivery: DeliveryMode::Concurrent,
        }
    }
}

// =============================================================================
// Output format
// =============================================================================

/// Which parts of an event a chat sink renders
///
/// Resolved once at load time; an empty string selects `All`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Free-text description only
    Text,
    /// Structured facts only
    Facts,
    /// Description and facts
    #[default]
    All,
}

impl OutputFormat {
    /// Whether the free-text description is rendered
    pub fn includes_text(self) -> bool {
        matches!(self, Self::Text | Self::All)
    }

    /// Whether structured facts are rendered
    pub fn includes_facts(self) -> bool {
        matches!(self, Self::Facts | Self::All)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "text" => Ok(Self::Text),
            "facts" | "fields" => Ok(Self::Facts),
            other => Err(format!(
                "unknown output format '{other}', expected one of: all, text, facts"
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Facts => "facts",
            Self::All => "all",
        })
    }
}

impl<'de> Deserialize<'de> for OutputFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

// =============================================================================
// Per-type configuration
// =============================================================================

/// Microsoft Teams sink configuration
///
/// # Example
///
/// ```toml
/// [sinks.teams]
/// webhook_url = "https://outlook.office.com/webhook/abc"
/// activity_image = "https://example.com/falco.png"
/// output_format = "facts"
/// minimum_priority = "warning"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeamsSinkConfig {
    #[serde(flatten)]
    pub delivery: DeliveryConfig,

    /// Incoming webhook URL
    /// Required when enabled
    pub webhook_url: String,

    /// Image shown next to the card title (empty = none)
    pub activity_image: String,

    /// Rendered parts of the event
    /// Default: all
    pub output_format: OutputFormat,
}

/// Fission sink configuration
///
/// Setting `kubeconfig` switches delivery from the in-cluster router
/// service to the Kubernetes API server's service proxy.
///
/// # Example
///
/// ```toml
/// [sinks.fission]
/// function = "falco-handler"
/// router_namespace = "fission"
/// router_service = "router"
/// router_port = 80
/// kubeconfig = "/home/ops/.kube/config"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FissionSinkConfig {
    #[serde(flatten)]
    pub delivery: DeliveryConfig,

    /// Function to invoke
    /// Required when enabled
    pub function: String,

    /// Namespace of the Fission router service
    /// Default: fission
    pub router_namespace: String,

    /// Name of the Fission router service
    /// Default: router
    pub router_service: String,

    /// Port of the Fission router service
    /// Default: 80
    pub router_port: u16,

    /// Kubeconfig used to reach the cluster control plane
    pub kubeconfig: Option<PathBuf>,
}

impl Default for FissionSinkConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryConfig::default(),
            function: String::new(),
            router_namespace: "fission".into(),
            router_service: "router".into(),
            router_port: 80,
            kubeconfig: None,
        }
    }
}

impl FissionSinkConfig {
    /// In-cluster gateway URL for the function
    pub fn gateway_url(&self) -> String {
        format!(
            "http://{}.{}.svc.cluster.local:{}/fission-function/{}",
            self.router_service, self.router_namespace, self.router_port, self.function
        )
    }
}

/// Generic webhook sink configuration
///
/// # Example
///
/// ```toml
/// [sinks.webhook]
/// address = "https://hooks.example.com/falco"
/// custom_headers = { Authorization = "Bearer abc" }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookSinkConfig {
    #[serde(flatten)]
    pub delivery: DeliveryConfig,

    /// Target URL
    /// Required when enabled
    pub address: String,

    /// Headers added to every request
    pub custom_headers: BTreeMap<String, String>,
}

#[cfg(test)]
#[path = "sinks_test.rs"]
mod sinks_test;
