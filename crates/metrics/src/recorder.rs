//! Outcome recorders
//!
//! A recorder is bound to one sink (or one inbound channel) and writes the
//! local counter, the Prometheus series and the StatsD push together. The
//! local and Prometheus writes happen under the group's lock so a reader
//! taking the same lock never sees the two spaces disagree.

use std::sync::Arc;

use parking_lot::Mutex;
use prometheus::{IntCounter, IntGauge};

use crate::snapshot::{InputSnapshot, SinkSnapshot};
use crate::statsd::StatsdPusher;
use crate::{Counter, Gauge};

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error,
}

impl Outcome {
    /// Status label shared by every counter space
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// Result of decoding one inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    Accepted,
    Rejected,
}

impl InputOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

// =============================================================================
// Counter groups (owned by the registry)
// =============================================================================

/// Local and Prometheus counters of one sink
#[derive(Debug)]
pub(crate) struct OutputGroup {
    lock: Mutex<()>,
    total: Counter,
    ok: Counter,
    error: Counter,
    prom_total: IntCounter,
    prom_ok: IntCounter,
    prom_error: IntCounter,
}

impl OutputGroup {
    pub(crate) fn new(prom_total: IntCounter, prom_ok: IntCounter, prom_error: IntCounter) -> Self {
        Self {
            lock: Mutex::new(()),
            total: Counter::new(),
            ok: Counter::new(),
            error: Counter::new(),
            prom_total,
            prom_ok,
            prom_error,
        }
    }

    pub(crate) fn snapshot(&self) -> SinkSnapshot {
        let _guard = self.lock.lock();
        SinkSnapshot {
            total: self.total.get(),
            ok: self.ok.get(),
            error: self.error.get(),
        }
    }

    /// Prometheus value for `status`; `None` for a status this group never writes
    pub(crate) fn prom_value(&self, status: &str) -> Option<u64> {
        match status {
            "total" => Some(self.prom_total.get()),
            "ok" => Some(self.prom_ok.get()),
            "error" => Some(self.prom_error.get()),
            _ => None,
        }
    }

    fn write(&self, local: &Counter, prom: &IntCounter) {
        let _guard = self.lock.lock();
        local.inc();
        prom.inc();
    }
}

/// Local and Prometheus counters of one inbound channel
#[derive(Debug)]
pub(crate) struct InputGroup {
    lock: Mutex<()>,
    total: Counter,
    accepted: Counter,
    rejected: Counter,
    prom_total: IntCounter,
    prom_accepted: IntCounter,
    prom_rejected: IntCounter,
}

impl InputGroup {
    pub(crate) fn new(
        prom_total: IntCounter,
        prom_accepted: IntCounter,
        prom_rejected: IntCounter,
    ) -> Self {
        Self {
            lock: Mutex::new(()),
            total: Counter::new(),
            accepted: Counter::new(),
            rejected: Counter::new(),
            prom_total,
            prom_accepted,
            prom_rejected,
        }
    }

    pub(crate) fn snapshot(&self) -> InputSnapshot {
        let _guard = self.lock.lock();
        InputSnapshot {
            total: self.total.get(),
            accepted: self.accepted.get(),
            rejected: self.rejected.get(),
        }
    }

    /// Prometheus value for `status`; `None` for a status this group never writes
    pub(crate) fn prom_value(&self, status: &str) -> Option<u64> {
        match status {
            "total" => Some(self.prom_total.get()),
            "accepted" => Some(self.prom_accepted.get()),
            "rejected" => Some(self.prom_rejected.get()),
            _ => None,
        }
    }

    fn write(&self, local: &Counter, prom: &IntCounter) {
        let _guard = self.lock.lock();
        local.inc();
        prom.inc();
    }
}

// =============================================================================
// Recorders (handed to sinks and inputs)
// =============================================================================

/// Outcome recorder for one sink
///
/// Obtained from `MetricsRegistry::sink_recorder`. Cheap to clone; all
/// clones write to the same counters.
#[derive(Debug, Clone)]
pub struct SinkRecorder {
    name: Arc<str>,
    group: Arc<OutputGroup>,
    statsd: Option<StatsdPusher>,
}

impl SinkRecorder {
    pub(crate) fn new(name: &str, group: Arc<OutputGroup>, statsd: Option<StatsdPusher>) -> Self {
        Self {
            name: name.into(),
            group,
            statsd,
        }
    }

    /// Sink this recorder belongs to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record that a delivery attempt started
    pub fn record_total(&self) {
        self.group.write(&self.group.total, &self.group.prom_total);
        self.push("total");
    }

    /// Record the result of a delivery attempt
    pub fn record(&self, outcome: Outcome) {
        match outcome {
            Outcome::Ok => self.group.write(&self.group.ok, &self.group.prom_ok),
            Outcome::Error => self.group.write(&self.group.error, &self.group.prom_error),
        }
        self.push(outcome.as_str());
    }

    /// Current local counters
    pub fn snapshot(&self) -> SinkSnapshot {
        self.group.snapshot()
    }

    fn push(&self, status: &str) {
        if let Some(ref statsd) = self.statsd {
            statsd.push("outputs", &[("output", &*self.name), ("status", status)]);
        }
    }
}

/// Counter recorder for one inbound channel
#[derive(Debug, Clone)]
pub struct InputRecorder {
    name: Arc<str>,
    group: Arc<InputGroup>,
    statsd: Option<StatsdPusher>,
}

impl InputRecorder {
    pub(crate) fn new(name: &str, group: Arc<InputGroup>, statsd: Option<StatsdPusher>) -> Self {
        Self {
            name: name.into(),
            group,
            statsd,
        }
    }

    /// Record that a request arrived
    pub fn record_total(&self) {
        self.group.write(&self.group.total, &self.group.prom_total);
        self.push("total");
    }

    /// Record whether the request was decoded
    pub fn record(&self, outcome: InputOutcome) {
        match outcome {
            InputOutcome::Accepted => {
                self.group.write(&self.group.accepted, &self.group.prom_accepted)
            }
            InputOutcome::Rejected => {
                self.group.write(&self.group.rejected, &self.group.prom_rejected)
            }
        }
        self.push(outcome.as_str());
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.group.snapshot()
    }

    fn push(&self, status: &str) {
        if let Some(ref statsd) = self.statsd {
            statsd.push("inputs", &[("source", &*self.name), ("status", status)]);
        }
    }
}

/// Marks one dispatch task as running; the gauge drops back when this does
#[derive(Debug)]
#[must_use = "the dispatch is only counted while the guard is alive"]
pub struct InFlightGuard {
    local: Arc<Gauge>,
    prom: IntGauge,
}

impl InFlightGuard {
    pub(crate) fn new(local: Arc<Gauge>, prom: IntGauge) -> Self {
        local.inc();
        prom.inc();
        Self { local, prom }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.local.dec();
        self.prom.dec();
    }
}
