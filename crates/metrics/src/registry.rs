//! Metrics registry
//!
//! Owns every counter the process exposes. Sinks and inputs get recorders
//! bound to their own counter group; introspection reads the whole
//! registry as an expvar-style JSON map or as Prometheus text.

use std::collections::BTreeMap;
use std::sync::Arc;

use herald_config::MetricsConfig;
use herald_protocol::Priority;
use parking_lot::RwLock;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde_json::{Map, Value, json};

use crate::error::{MetricsError, Result};
use crate::recorder::{InFlightGuard, InputGroup, InputRecorder, OutputGroup, SinkRecorder};
use crate::snapshot::{InputSnapshot, SinkSnapshot};
use crate::statsd::StatsdPusher;
use crate::{Counter, Gauge};

/// Expvar key of the priority histogram
pub const PRIORITY_KEY: &str = "herald.priority";

/// Expvar key of the in-flight dispatch gauge
const IN_FLIGHT_KEY: &str = "dispatches_in_flight";

/// Prometheus collectors, registered on a registry private to this instance
struct PromMetrics {
    registry: Registry,
    outputs: IntCounterVec,
    inputs: IntCounterVec,
    priority: IntCounterVec,
    in_flight: IntGauge,
}

impl PromMetrics {
    fn new(prefix: &str) -> Result<Self> {
        let registry = Registry::new();

        let outputs = counter_vec(
            &registry,
            &format!("{prefix}_outputs_total"),
            "Delivery attempts per sink and status",
            &["destination", "status"],
        )?;
        let inputs = counter_vec(
            &registry,
            &format!("{prefix}_inputs_total"),
            "Inbound requests per channel and status",
            &["source", "status"],
        )?;
        let priority = counter_vec(
            &registry,
            &format!("{prefix}_events_total"),
            "Ingested events per priority",
            &["priority"],
        )?;

        let in_flight_name = format!("{prefix}_dispatches_in_flight");
        let in_flight = IntGauge::with_opts(Opts::new(
            in_flight_name.clone(),
            "Sink dispatch tasks currently running",
        ))
        .map_err(|e| MetricsError::registration(&in_flight_name, e))?;
        registry
            .register(Box::new(in_flight.clone()))
            .map_err(|e| MetricsError::registration(&in_flight_name, e))?;

        // every priority is present from the start, even at zero
        for p in Priority::ALL {
            priority.with_label_values(&[p.label()]);
        }

        Ok(Self {
            registry,
            outputs,
            inputs,
            priority,
            in_flight,
        })
    }
}

fn counter_vec(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<IntCounterVec> {
    let vec = IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|e| MetricsError::registration(name, e))?;
    registry
        .register(Box::new(vec.clone()))
        .map_err(|e| MetricsError::registration(name, e))?;
    Ok(vec)
}

/// Process-wide metrics, shared as `Arc<MetricsRegistry>`
pub struct MetricsRegistry {
    prefix: String,
    outputs: RwLock<BTreeMap<String, Arc<OutputGroup>>>,
    inputs: RwLock<BTreeMap<String, Arc<InputGroup>>>,
    priorities: [Counter; 8],
    in_flight: Arc<Gauge>,
    prom: PromMetrics,
    statsd: Option<StatsdPusher>,
}

impl MetricsRegistry {
    /// Create a registry without a StatsD push
    ///
    /// `prefix` namespaces the Prometheus metric names and StatsD keys.
    pub fn new(prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let prom = PromMetrics::new(&prefix)?;

        Ok(Self {
            prefix,
            outputs: RwLock::new(BTreeMap::new()),
            inputs: RwLock::new(BTreeMap::new()),
            priorities: std::array::from_fn(|_| Counter::new()),
            in_flight: Arc::new(Gauge::new()),
            prom,
            statsd: None,
        })
    }

    /// Create a registry from the `[metrics]` section
    pub fn from_config(config: &MetricsConfig) -> Result<Self> {
        let registry = Self::new(config.prefix.clone())?;
        Ok(match config.statsd {
            Some(ref statsd) => {
                let pusher = StatsdPusher::new(statsd, config.prefix.clone());
                registry.with_statsd(pusher)
            }
            None => registry,
        })
    }

    /// Attach a StatsD push to every recorder handed out afterwards
    #[must_use]
    pub fn with_statsd(mut self, pusher: StatsdPusher) -> Self {
        self.statsd = Some(pusher);
        self
    }

    /// Metric name prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // =========================================================================
    // Recorders
    // =========================================================================

    /// Get the recorder for a sink, creating its counters on first use
    ///
    /// Recorders for the same name share counters.
    pub fn sink_recorder(&self, name: &str) -> SinkRecorder {
        if let Some(group) = self.outputs.read().get(name) {
            return SinkRecorder::new(name, Arc::clone(group), self.statsd.clone());
        }

        let mut outputs = self.outputs.write();
        let group = outputs.entry(name.to_owned()).or_insert_with(|| {
            let series = |status: &str| self.prom.outputs.with_label_values(&[name, status]);
            Arc::new(OutputGroup::new(
                series("total"),
                series("ok"),
                series("error"),
            ))
        });
        SinkRecorder::new(name, Arc::clone(group), self.statsd.clone())
    }

    /// Get the recorder for an inbound channel, creating its counters on first use
    pub fn input_recorder(&self, name: &str) -> InputRecorder {
        if let Some(group) = self.inputs.read().get(name) {
            return InputRecorder::new(name, Arc::clone(group), self.statsd.clone());
        }

        let mut inputs = self.inputs.write();
        let group = inputs.entry(name.to_owned()).or_insert_with(|| {
            let series = |status: &str| self.prom.inputs.with_label_values(&[name, status]);
            Arc::new(InputGroup::new(
                series("total"),
                series("accepted"),
                series("rejected"),
            ))
        });
        InputRecorder::new(name, Arc::clone(group), self.statsd.clone())
    }

    /// Count one ingested event in the priority histogram
    pub fn record_priority(&self, priority: Priority) {
        self.priorities[priority as usize].inc();
        self.prom.priority.with_label_values(&[priority.label()]).inc();
        if let Some(ref statsd) = self.statsd {
            statsd.push("events", &[("priority", priority.label())]);
        }
    }

    /// Count a dispatch task as running until the guard is dropped
    pub fn track_dispatch(&self) -> InFlightGuard {
        InFlightGuard::new(Arc::clone(&self.in_flight), self.prom.in_flight.clone())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Local counters of a sink, if it has a recorder
    pub fn sink_snapshot(&self, name: &str) -> Option<SinkSnapshot> {
        self.outputs.read().get(name).map(|group| group.snapshot())
    }

    /// Local counters of an inbound channel, if it has a recorder
    pub fn input_snapshot(&self, name: &str) -> Option<InputSnapshot> {
        self.inputs.read().get(name).map(|group| group.snapshot())
    }

    /// Priority histogram, every priority present
    pub fn priority_snapshot(&self) -> BTreeMap<Priority, u64> {
        Priority::ALL
            .into_iter()
            .map(|p| (p, self.priorities[p as usize].get()))
            .collect()
    }

    /// Number of dispatch tasks currently running
    pub fn in_flight(&self) -> i64 {
        self.in_flight.get()
    }

    /// Value of `<prefix>_outputs_total{destination, status}`
    ///
    /// Zero for sinks without a recorder and for unknown statuses. Never
    /// creates a series.
    pub fn prometheus_output(&self, destination: &str, status: &str) -> u64 {
        self.outputs
            .read()
            .get(destination)
            .and_then(|group| group.prom_value(status))
            .unwrap_or(0)
    }

    /// Value of `<prefix>_inputs_total{source, status}`
    pub fn prometheus_input(&self, source: &str, status: &str) -> u64 {
        self.inputs
            .read()
            .get(source)
            .and_then(|group| group.prom_value(status))
            .unwrap_or(0)
    }

    /// Process-local map in expvar layout
    ///
    /// ```json
    /// {
    ///   "cpu": "8",
    ///   "dispatches_in_flight": 0,
    ///   "herald.priority": { "critical": 1, "debug": 0, ... },
    ///   "inputs.http": { "accepted": 1, "rejected": 0, "total": 1 },
    ///   "outputs.teams": { "error": 0, "ok": 1, "total": 1 }
    /// }
    /// ```
    pub fn expvar_json(&self) -> Value {
        let mut map = Map::new();

        let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
        map.insert("cpu".into(), Value::String(cpus.to_string()));
        map.insert(IN_FLIGHT_KEY.into(), json!(self.in_flight()));

        let priorities: Map<String, Value> = Priority::ALL
            .into_iter()
            .map(|p| (p.label().to_owned(), json!(self.priorities[p as usize].get())))
            .collect();
        map.insert(PRIORITY_KEY.into(), Value::Object(priorities));

        for (name, group) in self.inputs.read().iter() {
            let s = group.snapshot();
            map.insert(
                format!("inputs.{name}"),
                json!({ "total": s.total, "accepted": s.accepted, "rejected": s.rejected }),
            );
        }

        for (name, group) in self.outputs.read().iter() {
            let s = group.snapshot();
            map.insert(
                format!("outputs.{name}"),
                json!({ "total": s.total, "ok": s.ok, "error": s.error }),
            );
        }

        Value::Object(map)
    }

    /// Prometheus text exposition of this registry
    pub fn prometheus_text(&self) -> Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.prom.registry.gather(), &mut buf)
            .map_err(MetricsError::Encode)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
