//! Event value handed to every sink
//!
//! An `Event` is created once by the ingestion layer and is read-only
//! afterwards. Sinks receive it by reference (the dispatcher shares it as
//! `Arc<Event>`), so no sink can observe another sink's view of it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::priority::Priority;

/// Scalar value of a rule-specific output field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Null,
}

impl FieldValue {
    /// String content, if this is a string field
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
            Self::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

/// One ingested alert
///
/// Field names on the wire follow the Falco JSON output
/// (`output_fields`, `hostname`, `tags`, `time`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Name of the rule that fired
    pub rule: String,

    /// Severity
    pub priority: Priority,

    /// Free-text description
    pub output: String,

    /// Origin tag (e.g. `syscall`, `k8s_audit`)
    #[serde(default)]
    pub source: String,

    /// Host the event was observed on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Rule tags
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Rule-specific context
    #[serde(default)]
    pub output_fields: BTreeMap<String, FieldValue>,

    /// When the event was observed
    /// Defaults to the decode time when the document omits it
    #[serde(default = "Utc::now")]
    pub time: DateTime<Utc>,
}

impl Event {
    /// Create an event with empty fields, tags and hostname
    pub fn new(
        rule: impl Into<String>,
        priority: Priority,
        output: impl Into<String>,
        source: impl Into<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            rule: rule.into(),
            priority,
            output: output.into(),
            source: source.into(),
            hostname: None,
            tags: BTreeSet::new(),
            output_fields: BTreeMap::new(),
            time,
        }
    }

    /// Set the hostname
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Add an output field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.output_fields.insert(name.into(), value.into());
        self
    }

    /// Decode an event from its JSON document
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Hostname, treating an empty string as absent
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref().filter(|h| !h.is_empty())
    }
}
